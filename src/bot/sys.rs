use crate::bot::{gen_help_msg, Bot, Message, Response};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::path::Path;

const BASIC_FILE: &str = "basic.data";
const SAY_FILE: &str = "say.data";
const SAY_TRIGGER: &str = "say!";

#[derive(Debug, Clone)]
struct Command {
    triggers: Vec<String>,
    reply: String,
}

/// Canned replies loaded from the data directory.
#[derive(Debug, Clone, Default)]
pub struct Sys {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
    say: Vec<String>,
}

fn parse_basic(data: &str) -> Vec<Command> {
    data.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let mut parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() < 2 {
                log::warn!("bad sys line {:?}", line);
                return None;
            }
            let reply = parts.pop()?.to_string();
            let triggers = parts.into_iter().map(str::to_lowercase).collect();
            Some(Command { triggers, reply })
        })
        .collect()
}

impl Sys {
    pub fn parse(basic: &str, say: &str) -> Self {
        let commands = parse_basic(basic);
        let mut index = HashMap::new();
        for (i, c) in commands.iter().enumerate() {
            for t in &c.triggers {
                index.insert(t.clone(), i);
            }
        }
        let say = say
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { commands, index, say }
    }

    /// Loads `basic.data` and, if present, `say.data` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let basic_path = dir.join(BASIC_FILE);
        let basic = std::fs::read_to_string(&basic_path)
            .with_context(|| format!("can't read {}", basic_path.display()))?;
        let say = std::fs::read_to_string(dir.join(SAY_FILE)).unwrap_or_default();
        let sys = Self::parse(&basic, &say);
        log::info!("loaded {} sys commands, {} say lines", sys.commands.len(), sys.say.len());
        Ok(sys)
    }
}

#[async_trait]
impl Bot for Sys {
    async fn on_message(&self, msg: &Message) -> Response {
        let text = msg.normalized_text();
        if text == SAY_TRIGGER {
            return match self.say.choose(&mut rand::thread_rng()) {
                Some(line) => Response::text(line.clone()),
                None => Response::none(),
            };
        }
        match self.index.get(&text) {
            Some(i) => Response::text(self.commands[*i].reply.clone()),
            None => Response::none(),
        }
    }

    fn react_on(&self) -> Vec<String> {
        let mut res: Vec<String> = self.commands.iter().flat_map(|c| c.triggers.clone()).collect();
        if !self.say.is_empty() {
            res.push(SAY_TRIGGER.to_string());
        }
        res
    }

    fn help(&self) -> String {
        let triggers = self.react_on();
        if triggers.is_empty() {
            return String::new();
        }
        gen_help_msg(&triggers, "простые команды")
    }
}

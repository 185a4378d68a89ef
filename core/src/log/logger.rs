use log::LevelFilter;
use log4rs::config::Logger;
use std::{collections::HashMap, env, mem, str::FromStr};

/// Per-target log levels resolved from all parsed expressions,
/// plus the root level for everything unmatched.
pub(super) struct Loggers {
    loggers: HashMap<String, LevelFilter>,
    root_level: LevelFilter,
}

impl Loggers {
    pub fn root_level(&self) -> LevelFilter {
        self.root_level
    }

    pub fn items(&self) -> impl IntoIterator<Item = Logger> + '_ {
        self.loggers.iter().map(|(name, level)| Logger::builder().build(name.clone(), *level))
    }
}

pub(super) struct Builder {
    loggers: HashMap<String, LevelFilter>,
    root_level: Option<LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { loggers: HashMap::new(), root_level: None }
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    /// Parses a comma-separated spec expression. Later specs (including
    /// later `parse_*` calls) win over earlier ones, so explicit arguments
    /// should be parsed after the environment.
    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            match spec.split_once('=') {
                // A bare log-level string sets the root level; any other
                // bare word is a target logged at full verbosity
                None => match LevelFilter::from_str(spec) {
                    Ok(level) => {
                        self.root_level = Some(level);
                    }
                    Err(_) => {
                        self.loggers.insert(spec.to_string(), LevelFilter::max());
                    }
                },
                Some((target, level)) => match LevelFilter::from_str(level.trim()) {
                    Ok(level) => {
                        self.loggers.insert(target.trim().to_string(), level);
                    }
                    Err(_) => {
                        println!("Ignoring invalid logging spec '{}'", spec);
                    }
                },
            }
        }
        self
    }

    pub fn build(&mut self) -> Loggers {
        Loggers { loggers: mem::take(&mut self.loggers), root_level: self.root_level.take().unwrap_or(LevelFilter::Error) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expression() {
        let mut builder = Builder::new();
        builder.parse_expression("info, chainstore_history=trace,bogus=notalevel");
        let loggers = builder.build();
        assert_eq!(loggers.root_level(), LevelFilter::Info);
        assert_eq!(loggers.loggers.get("chainstore_history"), Some(&LevelFilter::Trace));
        assert!(!loggers.loggers.contains_key("bogus"));
    }

    #[test]
    fn test_empty_expression_defaults_to_error_root() {
        let loggers = Builder::new().build();
        assert_eq!(loggers.root_level(), LevelFilter::Error);
        assert!(loggers.loggers.is_empty());
    }
}

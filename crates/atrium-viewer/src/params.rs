//! Launch parameters and host commands
//!
//! Both arrive as plain strings, from the URL query or command line at
//! launch and from `atrium:command` events afterwards.

use std::str::FromStr;

use atrium_core::{ModelRequest, Variant, ViewerMode};
use tracing::warn;

/// What to show first; absent fields take their defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub mode: Option<ViewerMode>,
    pub unit: Option<u32>,
    pub variant: Option<Variant>,
}

impl LaunchParams {
    /// Read `mode`, `unit` and `variant` from query pairs; bad values are
    /// logged and ignored
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key {
                "mode" => params.mode = parse_or_warn(key, value),
                "unit" => params.unit = parse_or_warn(key, value),
                "variant" => params.variant = parse_or_warn(key, value),
                _ => {}
            }
        }
        params
    }

    /// A unit number without a mode selects the unit viewer
    pub fn request(&self, default_unit: u32) -> ModelRequest {
        let variant = self.variant.unwrap_or_default();
        let mode = self.mode.unwrap_or(if self.unit.is_some() {
            ViewerMode::Unit
        } else {
            ViewerMode::Building
        });
        match mode {
            ViewerMode::Unit => ModelRequest::Unit {
                unit: self.unit.unwrap_or(default_unit),
                variant,
            },
            ViewerMode::Building => ModelRequest::Building { variant },
        }
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value, "Ignoring invalid launch parameter");
            None
        }
    }
}

/// Command sent by the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Show another unit, keeping the variant
    Unit(u32),
    /// Show the current model in another variant
    Variant(Variant),
    Reset,
    Close,
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('=') {
            Some(("unit", value)) => value
                .trim()
                .parse()
                .map(HostCommand::Unit)
                .map_err(|_| format!("invalid unit '{value}'")),
            Some(("variant", value)) => value.parse().map(HostCommand::Variant),
            Some(_) => Err(format!("unknown command '{s}'")),
            None => match s {
                "reset" => Ok(HostCommand::Reset),
                "close" => Ok(HostCommand::Close),
                other => Err(format!("unknown command '{other}'")),
            },
        }
    }
}

impl HostCommand {
    /// Model this command switches to, given the one currently requested
    pub fn model_request(self, current: ModelRequest) -> Option<ModelRequest> {
        match self {
            HostCommand::Unit(unit) => Some(ModelRequest::Unit {
                unit,
                variant: current.variant(),
            }),
            HostCommand::Variant(variant) => Some(current.with_variant(variant)),
            HostCommand::Reset | HostCommand::Close => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_from_query_pairs() {
        let params = LaunchParams::from_pairs([("mode", "unit"), ("unit", "23"), ("variant", "without")]);
        assert_eq!(
            params.request(1),
            ModelRequest::Unit {
                unit: 23,
                variant: Variant::Without
            }
        );
    }

    #[test]
    fn test_launch_defaults_to_building() {
        let params = LaunchParams::from_pairs([("ref", "mail")]);
        assert_eq!(
            params.request(1),
            ModelRequest::Building {
                variant: Variant::With
            }
        );
    }

    #[test]
    fn test_launch_unit_implies_unit_mode() {
        let params = LaunchParams::from_pairs([("unit", "7")]);
        assert_eq!(params.request(1).unit(), Some(7));
    }

    #[test]
    fn test_launch_ignores_bad_values() {
        let params = LaunchParams::from_pairs([("mode", "unit"), ("unit", "abc"), ("variant", "attic")]);
        assert_eq!(params.unit, None);
        assert_eq!(params.variant, None);
        assert_eq!(
            params.request(1),
            ModelRequest::Unit {
                unit: 1,
                variant: Variant::With
            }
        );
    }

    #[test]
    fn test_parse_host_commands() {
        assert_eq!("unit=12".parse(), Ok(HostCommand::Unit(12)));
        assert_eq!(" variant=furniture ".parse(), Ok(HostCommand::Variant(Variant::Furniture)));
        assert_eq!("reset".parse(), Ok(HostCommand::Reset));
        assert_eq!("close".parse(), Ok(HostCommand::Close));
        assert!("unit=twelve".parse::<HostCommand>().is_err());
        assert!("zoom=2".parse::<HostCommand>().is_err());
        assert!("spin".parse::<HostCommand>().is_err());
    }

    #[test]
    fn test_command_keeps_current_variant_and_unit() {
        let current = ModelRequest::Unit {
            unit: 5,
            variant: Variant::Without,
        };
        assert_eq!(
            HostCommand::Unit(9).model_request(current),
            Some(ModelRequest::Unit {
                unit: 9,
                variant: Variant::Without
            })
        );
        assert_eq!(
            HostCommand::Variant(Variant::With).model_request(current),
            Some(ModelRequest::Unit {
                unit: 5,
                variant: Variant::With
            })
        );
        assert_eq!(HostCommand::Reset.model_request(current), None);
    }
}

//! Operator commands typed at the console

use bytes::Bytes;
use minibot_shared::codec::{self, ControlFrame};
use minibot_shared::link;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  list                                   show discovered robots
  estop                                  emergency stop every robot
  release                                release the emergency stop
  teleop                                 switch every robot to teleop
  standby                                stop every robot and switch it to standby
  phase <robot> <phase>                  set game phase (e.g. teleop, standby)
  drive <robot> <lx> <ly> <rx> <ry> [b]  send one control frame (b = button mask)
  stop <robot>                           send a centred control frame
  help                                   show this text";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid {field}: {value:?} (expected 0..=255)")]
    InvalidByte { field: &'static str, value: String },
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    List,
    Help,
    EmergencyStop,
    Release,
    Teleop,
    Standby,
    Phase { robot: String, phase: String },
    Drive { robot: String, frame: ControlFrame },
    Stop { robot: String },
}

/// Who a datagram goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every robot, including ones the console has not heard from
    AllRobots,
    Robot(String),
}

impl OperatorCommand {
    /// Parse one line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("list" | "ls", []) => OperatorCommand::List,
            ("help" | "?", _) => OperatorCommand::Help,
            ("estop", []) => OperatorCommand::EmergencyStop,
            ("release", []) => OperatorCommand::Release,
            ("teleop", []) => OperatorCommand::Teleop,
            ("standby", []) => OperatorCommand::Standby,
            ("phase", [robot, phase]) => OperatorCommand::Phase {
                robot: robot.to_string(),
                phase: phase.to_string(),
            },
            ("phase", _) => return Err(ParseError::Usage("phase <robot> <phase>")),
            ("drive", [robot, lx, ly, rx, ry, rest @ ..]) if rest.len() <= 1 => {
                let axes = [
                    parse_byte("lx", lx)?,
                    parse_byte("ly", ly)?,
                    parse_byte("rx", rx)?,
                    parse_byte("ry", ry)?,
                ];
                let buttons = match rest.first() {
                    Some(b) => parse_byte("buttons", b)?,
                    None => 0,
                };
                OperatorCommand::Drive {
                    robot: robot.to_string(),
                    frame: ControlFrame::from_parts(axes, buttons),
                }
            }
            ("drive", _) => {
                return Err(ParseError::Usage("drive <robot> <lx> <ly> <rx> <ry> [buttons]"))
            }
            ("stop", [robot]) => OperatorCommand::Stop {
                robot: robot.to_string(),
            },
            ("stop", _) => return Err(ParseError::Usage("stop <robot>")),
            ("list" | "ls" | "estop" | "release" | "teleop" | "standby", _) => {
                return Err(ParseError::Usage("command takes no arguments"))
            }
            _ => return Err(ParseError::UnknownCommand(verb.to_string())),
        };

        Ok(Some(command))
    }

    /// Datagrams this command puts on the wire, in send order
    ///
    /// `fleet` lists the identities of the known robots; fleet-wide phase
    /// changes are addressed to each of them.
    pub fn datagrams(&self, fleet: &[&str]) -> Vec<(Target, Bytes)> {
        match self {
            OperatorCommand::List | OperatorCommand::Help => Vec::new(),
            OperatorCommand::EmergencyStop => {
                vec![(Target::AllRobots, codec::encode_emergency_stop(true))]
            }
            OperatorCommand::Release => {
                vec![(Target::AllRobots, codec::encode_emergency_stop(false))]
            }
            OperatorCommand::Teleop => fleet
                .iter()
                .map(|robot| phase_datagram(robot, link::TELEOP_PHASE))
                .collect(),
            // Robots drop control frames outside teleop, so stop them first
            OperatorCommand::Standby => {
                let mut out: Vec<_> = fleet.iter().map(|robot| stop_datagram(robot)).collect();
                out.extend(
                    fleet
                        .iter()
                        .map(|robot| phase_datagram(robot, link::STANDBY_PHASE)),
                );
                out
            }
            OperatorCommand::Phase { robot, phase } => vec![phase_datagram(robot, phase)],
            OperatorCommand::Drive { robot, frame } => vec![(
                Target::Robot(robot.clone()),
                codec::encode_control_frame(robot, frame),
            )],
            OperatorCommand::Stop { robot } => vec![stop_datagram(robot)],
        }
    }
}

fn phase_datagram(robot: &str, phase: &str) -> (Target, Bytes) {
    (
        Target::Robot(robot.to_string()),
        codec::encode_phase_update(robot, phase),
    )
}

fn stop_datagram(robot: &str) -> (Target, Bytes) {
    (
        Target::Robot(robot.to_string()),
        codec::encode_control_frame(robot, &ControlFrame::neutral()),
    )
}

/// Accepts decimal or `0x`-prefixed hex
fn parse_byte(field: &'static str, value: &str) -> Result<u8, ParseError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| ParseError::InvalidByte {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use minibot_shared::LinkCommand;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(OperatorCommand::parse("   "), Ok(None));
        assert_eq!(OperatorCommand::parse("list"), Ok(Some(OperatorCommand::List)));
        assert_eq!(OperatorCommand::parse("ESTOP"), Ok(Some(OperatorCommand::EmergencyStop)));
        assert_eq!(OperatorCommand::parse("release"), Ok(Some(OperatorCommand::Release)));
        assert_eq!(
            OperatorCommand::parse("phase robotA teleop"),
            Ok(Some(OperatorCommand::Phase {
                robot: "robotA".into(),
                phase: "teleop".into()
            }))
        );
    }

    #[test]
    fn test_parse_drive() {
        let cmd = OperatorCommand::parse("drive robotA 200 50 10 255 0x05")
            .unwrap()
            .unwrap();
        match cmd {
            OperatorCommand::Drive { robot, frame } => {
                assert_eq!(robot, "robotA");
                assert_eq!(frame, ControlFrame::from_parts([200, 50, 10, 255], 0x05));
            }
            other => panic!("expected drive, got {:?}", other),
        }

        let cmd = OperatorCommand::parse("drive robotA 1 2 3 4").unwrap().unwrap();
        assert!(matches!(cmd, OperatorCommand::Drive { frame, .. } if frame.buttons() == 0));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            OperatorCommand::parse("fly robotA"),
            Err(ParseError::UnknownCommand("fly".into()))
        );
        assert!(matches!(
            OperatorCommand::parse("phase robotA"),
            Err(ParseError::Usage(_))
        ));
        assert!(matches!(
            OperatorCommand::parse("drive robotA 1 2 3"),
            Err(ParseError::Usage(_))
        ));
        assert_eq!(
            OperatorCommand::parse("drive robotA 1 2 3 256"),
            Err(ParseError::InvalidByte {
                field: "ry",
                value: "256".into()
            })
        );
        assert!(matches!(
            OperatorCommand::parse("estop now"),
            Err(ParseError::Usage(_))
        ));
    }

    #[test]
    fn test_datagrams_decode_on_the_robot() {
        let datagrams = OperatorCommand::EmergencyStop.datagrams(&[]);
        assert_eq!(datagrams.len(), 1);
        let (target, bytes) = &datagrams[0];
        assert_eq!(*target, Target::AllRobots);
        assert_eq!(codec::classify(bytes, "robotA"), LinkCommand::EmergencyStop);

        let datagrams = OperatorCommand::Stop {
            robot: "robotA".into(),
        }
        .datagrams(&[]);
        let (target, bytes) = &datagrams[0];
        assert_eq!(*target, Target::Robot("robotA".into()));
        assert_eq!(
            codec::classify(bytes, "robotA"),
            LinkCommand::Control {
                frame: ControlFrame::neutral(),
                target: "robotA".into()
            }
        );

        assert!(OperatorCommand::List.datagrams(&["robotA"]).is_empty());
    }

    #[test]
    fn test_teleop_reaches_every_robot() {
        assert_eq!(OperatorCommand::parse("teleop"), Ok(Some(OperatorCommand::Teleop)));

        let datagrams = OperatorCommand::Teleop.datagrams(&["robotA", "robotB"]);
        assert_eq!(datagrams.len(), 2);
        for ((target, bytes), id) in datagrams.iter().zip(["robotA", "robotB"]) {
            assert_eq!(*target, Target::Robot(id.into()));
            assert_eq!(
                codec::classify(bytes, id),
                LinkCommand::PhaseUpdate {
                    phase: link::TELEOP_PHASE.into()
                }
            );
        }

        assert!(OperatorCommand::Teleop.datagrams(&[]).is_empty());
    }

    #[test]
    fn test_standby_stops_then_changes_phase() {
        assert_eq!(OperatorCommand::parse("standby"), Ok(Some(OperatorCommand::Standby)));
        assert!(matches!(
            OperatorCommand::parse("standby now"),
            Err(ParseError::Usage(_))
        ));

        let datagrams = OperatorCommand::Standby.datagrams(&["robotA", "robotB"]);
        let decoded: Vec<_> = datagrams
            .iter()
            .map(|(target, bytes)| match target {
                Target::Robot(id) => (id.clone(), codec::classify(bytes, id)),
                Target::AllRobots => panic!("standby is addressed per robot"),
            })
            .collect();

        let standby = |id: &str| {
            (
                id.to_string(),
                LinkCommand::PhaseUpdate {
                    phase: link::STANDBY_PHASE.into(),
                },
            )
        };
        let stop = |id: &str| {
            (
                id.to_string(),
                LinkCommand::Control {
                    frame: ControlFrame::neutral(),
                    target: id.into(),
                },
            )
        };
        assert_eq!(
            decoded,
            vec![stop("robotA"), stop("robotB"), standby("robotA"), standby("robotB")]
        );
    }
}

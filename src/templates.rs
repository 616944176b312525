use std::fmt::Display;

use egui::Vec2;

use crate::graph::ComponentKind;

/// Direction of a port in the local frame of its component. `Both` only
/// appears on junction ports that have not received their first wire yet.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Both,
}

impl Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("Input"),
            Self::Output => f.write_str("Output"),
            Self::Both => f.write_str("Both"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinSpec {
    pub direction: PortDirection,
    pub offset: Vec2,
}

/// Fixed local-frame geometry of a component kind: nominal footprint plus
/// the pin offsets, in port-letter order (A, B, C, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentTemplate {
    pub size: Vec2,
    pub pins: &'static [PinSpec],
}

const PIN_LENGTH: f32 = 10.0;
const PIN_Y_OFFSET: f32 = 20.0;

pub static AND_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(100.0, 100.0),
    pins: &[
        PinSpec {
            direction: PortDirection::Input,
            offset: Vec2::new(-PIN_LENGTH, PIN_Y_OFFSET),
        },
        PinSpec {
            direction: PortDirection::Input,
            offset: Vec2::new(-PIN_LENGTH, 100.0 - PIN_Y_OFFSET),
        },
        PinSpec {
            direction: PortDirection::Output,
            offset: Vec2::new(100.0 + PIN_LENGTH, 50.0),
        },
    ],
};

pub static OR_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(120.0, 100.0),
    pins: &[
        PinSpec {
            direction: PortDirection::Input,
            offset: Vec2::new(-PIN_LENGTH, PIN_Y_OFFSET),
        },
        PinSpec {
            direction: PortDirection::Input,
            offset: Vec2::new(-PIN_LENGTH, 100.0 - PIN_Y_OFFSET),
        },
        PinSpec {
            direction: PortDirection::Output,
            offset: Vec2::new(120.0 + PIN_LENGTH, 50.0),
        },
    ],
};

pub static NOT_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(100.0, 80.0),
    pins: &[
        PinSpec {
            direction: PortDirection::Input,
            offset: Vec2::new(-10.0, 40.0),
        },
        PinSpec {
            direction: PortDirection::Output,
            offset: Vec2::new(98.0, 40.0),
        },
    ],
};

pub static INPUT_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(30.0, 30.0),
    pins: &[PinSpec {
        direction: PortDirection::Output,
        offset: Vec2::new(45.0, 15.0),
    }],
};

pub static OUTPUT_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(30.0, 30.0),
    pins: &[PinSpec {
        direction: PortDirection::Input,
        offset: Vec2::new(-20.0, 0.0),
    }],
};

pub static JUNCTION_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(10.0, 10.0),
    pins: &[
        PinSpec {
            direction: PortDirection::Both,
            offset: Vec2::new(0.0, -20.0),
        },
        PinSpec {
            direction: PortDirection::Both,
            offset: Vec2::new(0.0, 20.0),
        },
        PinSpec {
            direction: PortDirection::Both,
            offset: Vec2::new(-20.0, 0.0),
        },
        PinSpec {
            direction: PortDirection::Both,
            offset: Vec2::new(20.0, 0.0),
        },
    ],
};

/// A freshly spawned wire has no ports of its own; its two endpoints are
/// seeded at these offsets from the spawn position.
pub static WIRE_TEMPLATE: ComponentTemplate = ComponentTemplate {
    size: Vec2::new(60.0, 0.0),
    pins: &[],
};

pub const WIRE_ENDPOINT_OFFSETS: [Vec2; 2] = [Vec2::new(-30.0, 0.0), Vec2::new(30.0, 0.0)];

/// Pure lookup from component kind to its fixed local geometry. Returns
/// `None` for the reserved gate kinds (NAND/NOR/XOR/XNOR), which exist in
/// the enumeration but cannot be placed yet.
pub fn template(kind: ComponentKind) -> Option<&'static ComponentTemplate> {
    match kind {
        ComponentKind::And => Some(&AND_TEMPLATE),
        ComponentKind::Or => Some(&OR_TEMPLATE),
        ComponentKind::Not => Some(&NOT_TEMPLATE),
        ComponentKind::Input => Some(&INPUT_TEMPLATE),
        ComponentKind::Output => Some(&OUTPUT_TEMPLATE),
        ComponentKind::Junction => Some(&JUNCTION_TEMPLATE),
        ComponentKind::Wire => Some(&WIRE_TEMPLATE),
        ComponentKind::Nand | ComponentKind::Nor | ComponentKind::Xor | ComponentKind::Xnor => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_kinds_have_no_template() {
        for kind in [
            ComponentKind::Nand,
            ComponentKind::Nor,
            ComponentKind::Xor,
            ComponentKind::Xnor,
        ] {
            assert!(template(kind).is_none(), "{kind} should be reserved");
        }
    }

    #[test]
    fn gate_templates_have_two_inputs_one_output() {
        for tpl in [&AND_TEMPLATE, &OR_TEMPLATE] {
            let inputs = tpl
                .pins
                .iter()
                .filter(|p| p.direction == PortDirection::Input)
                .count();
            let outputs = tpl
                .pins
                .iter()
                .filter(|p| p.direction == PortDirection::Output)
                .count();
            assert_eq!(inputs, 2);
            assert_eq!(outputs, 1);
        }
    }

    #[test]
    fn junction_ports_all_start_both() {
        assert_eq!(JUNCTION_TEMPLATE.pins.len(), 4);
        assert!(
            JUNCTION_TEMPLATE
                .pins
                .iter()
                .all(|p| p.direction == PortDirection::Both)
        );
    }
}

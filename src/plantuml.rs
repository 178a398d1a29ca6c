//! PlantUML diagram generation

use std::fmt::Debug;
use std::hash::Hash;

use crate::hierarchy::{Kind, StateId};
use crate::Hierarchy;

/// Generate a PlantUML diagram of the nested states, the recorded transitions
/// and the current leaf
pub fn generate_plantuml<S, CTX, E>(
    hierarchy: &Hierarchy<S, CTX, E>,
    transitions: &[(S, S)],
    current_state: Option<&S>,
) -> String
where
    S: Clone + Debug + Eq + Hash + Send + Sync,
    CTX: Send,
    E: Sync,
{
    let mut plantuml = String::new();
    plantuml.push_str("@startuml\n");
    plantuml.push_str("skinparam state {\n");
    plantuml.push_str("  BackgroundColor<<Current>> YellowGreen\n");
    plantuml.push_str("}\n\n");

    plantuml.push_str(&format!("[*] --> {:?}\n", hierarchy.root()));
    render_state(&mut plantuml, hierarchy, hierarchy.root_id(), 0);

    if !transitions.is_empty() {
        plantuml.push('\n');
    }
    for (from, to) in transitions {
        plantuml.push_str(&format!("{:?} --> {:?}\n", from, to));
    }

    if let Some(current) = current_state {
        plantuml.push_str(&format!("state {:?} <<Current>>\n", current));
    }

    plantuml.push_str("@enduml\n");
    plantuml
}

fn render_state<S, CTX, E>(
    out: &mut String,
    hierarchy: &Hierarchy<S, CTX, E>,
    id: StateId,
    level: usize,
) where
    S: Clone + Debug + Eq + Hash + Send + Sync,
    CTX: Send,
    E: Sync,
{
    let indent = "  ".repeat(level);
    let node = hierarchy.node(id);
    match node.kind {
        Kind::Leaf => out.push_str(&format!("{}state {:?}\n", indent, node.state)),
        Kind::Composite { initial } => {
            out.push_str(&format!("{}state {:?} {{\n", indent, node.state));
            out.push_str(&format!(
                "{}  [*] --> {:?}\n",
                indent,
                hierarchy.node(initial).state
            ));
            for child in hierarchy.children(id) {
                render_state(out, hierarchy, child, level + 1);
            }
            out.push_str(&format!("{}}}\n", indent));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HierarchyBuilder, Passive};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Light {
        Powered,
        Off,
        On,
        Dim,
        Bright,
    }

    #[test]
    fn test_nested_rendering() {
        let h: Hierarchy<Light, (), ()> = HierarchyBuilder::new()
            .root(Light::Powered, Light::Off, Passive)
            .leaf(Light::Off, Light::Powered, Passive)
            .composite(Light::On, Light::Powered, Light::Dim, Passive)
            .leaf(Light::Dim, Light::On, Passive)
            .leaf(Light::Bright, Light::On, Passive)
            .build()
            .unwrap();

        let out = generate_plantuml(&h, &[(Light::Off, Light::On)], Some(&Light::Dim));

        assert!(out.starts_with("@startuml\n"));
        assert!(out.ends_with("@enduml\n"));
        assert!(out.contains("[*] --> Powered\nstate Powered {\n  [*] --> Off\n"));
        assert!(out.contains(
            "  state On {\n    [*] --> Dim\n    state Dim\n    state Bright\n  }\n"
        ));
        assert!(out.contains("Off --> On\n"));
        assert!(out.contains("state Dim <<Current>>\n"));
        assert_eq!(h.to_plantuml().matches("-->").count(), 3);
    }
}

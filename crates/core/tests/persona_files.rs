//! The persona documents shipped in the repository must load and validate.

use std::path::PathBuf;
use teller_core::persona::{AgentRole, PersonaSet};

fn persona_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../personas")
}

#[test]
fn shipped_personas_load_and_validate() {
    let set = PersonaSet::load(&persona_dir()).expect("shipped personas must be valid");

    let a = set.get(AgentRole::A);
    assert_eq!(a.voice, "shimmer");
    assert!(a.tools.iter().any(|t| t.name == "search_knowledge_base"));
    assert!(a.tools.iter().any(|t| t.name == "handoff_to_b"));
    assert!((800..=2500).contains(&a.handoff_delay_ms));

    let b = set.get(AgentRole::B);
    assert!(b.tools.iter().any(|t| t.name == "get_account_balance"));
    assert!(b.tools.iter().any(|t| t.name == "freeze_card"));
    assert!(b.tools.iter().any(|t| t.name == "handoff_to_a"));
    assert!(!b.tools.iter().any(|t| t.name == "handoff_to_b"));
}

#[test]
fn shipped_tool_schemas_render_for_the_wire() {
    let set = PersonaSet::load(&persona_dir()).unwrap();
    for role in [AgentRole::A, AgentRole::B] {
        for tool in &set.get(role).tools {
            let rendered = tool.to_realtime_tool();
            assert_eq!(rendered["type"], "function");
            assert!(rendered["parameters"]["properties"].is_object());
        }
    }
}

//! Tests for TreeEditor: add, delete, move, update, clone and bean collection edits

use std::path::PathBuf;

use routekit::domain::schema::{self, SchemaRegistry};
use routekit::domain::{Codec, Document, Node, NodeId, TreeEditor};
use routekit::util::testing;

fn registry() -> &'static SchemaRegistry {
    testing::init_test_setup();
    schema::global().expect("builtin catalog")
}

fn load(name: &str) -> Document {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources/flows")
        .join(name);
    let text = std::fs::read_to_string(&path).expect("read fixture");
    Codec::new(registry()).parse(name, &text)
}

/// Identity of the step at `index` in the first route's `from.steps`.
fn step_id(doc: &Document, route: usize, index: usize) -> NodeId {
    doc.flows[route]
        .child("from")
        .expect("from")
        .children("steps")[index]
        .id()
        .clone()
}

fn from_id(doc: &Document, route: usize) -> NodeId {
    doc.flows[route].child("from").expect("from").id().clone()
}

fn step_kinds(doc: &Document, route: usize) -> Vec<String> {
    doc.flows[route]
        .child("from")
        .expect("from")
        .children("steps")
        .iter()
        .map(|s| s.kind().to_string())
        .collect()
}

#[test]
fn given_step_added_to_from_when_deleted_again_then_document_restored() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let parent = from_id(&doc, 0);
    let node = Node::new("SetHeaderDefinition").with_value("name", "kind");
    let added_id = node.id().clone();

    // Act
    let added = editor.add(&doc, node, Some(&parent), Some(1));
    let restored = editor.delete(&added, &added_id);

    // Assert
    assert_eq!(
        step_kinds(&added, 0),
        vec!["LogDefinition", "SetHeaderDefinition", "ToDefinition"]
    );
    assert_eq!(restored, doc);
}

#[test]
fn given_route_added_with_parent_when_adding_then_appended_at_top_level() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let parent = from_id(&doc, 0);

    let added = editor.add(&doc, Node::new("RouteDefinition"), Some(&parent), Some(0));

    assert_eq!(added.flows.len(), 3);
    assert_eq!(added.flows[2].kind(), "RouteDefinition");
}

#[test]
fn given_parent_without_matching_slot_when_adding_then_document_unchanged() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let log = step_id(&doc, 0, 0);

    let result = editor.add(&doc, Node::new("ToDefinition"), Some(&log), None);

    assert_eq!(result, doc);
}

#[test]
fn given_when_branch_added_to_choice_when_adding_then_lands_in_when_list() {
    let editor = TreeEditor::new(registry());
    let doc = load("orders-integration.yaml");
    let choice = step_id(&doc, 0, 0);

    let result = editor.add(&doc, Node::new("WhenDefinition"), Some(&choice), None);

    let choice_node = editor.find(&result, &choice).expect("choice").node;
    assert_eq!(choice_node.children("when").len(), 2);
}

#[test]
fn given_missing_id_when_deleting_then_document_unchanged() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");

    let result = editor.delete(&doc, &NodeId::from("no-such-node"));

    assert_eq!(result, doc);
}

#[test]
fn given_otherwise_when_deleted_then_single_slot_cleared() {
    let editor = TreeEditor::new(registry());
    let doc = load("orders-integration.yaml");
    let choice = step_id(&doc, 0, 0);
    let otherwise = editor
        .find(&doc, &choice)
        .and_then(|l| l.node.child("otherwise"))
        .expect("otherwise")
        .id()
        .clone();

    let result = editor.delete(&doc, &otherwise);

    let choice_node = editor.find(&result, &choice).expect("choice").node;
    assert!(choice_node.child("otherwise").is_none());
    assert!(editor.find(&result, &otherwise).is_none());
}

#[test]
fn given_node_found_when_locating_then_parent_field_and_position_reported() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let to = step_id(&doc, 0, 1);

    let located = editor.find(&doc, &to).expect("found");

    assert_eq!(located.parent_id.as_ref(), Some(&from_id(&doc, 0)));
    assert_eq!(located.field.as_deref(), Some("steps"));
    assert_eq!(located.position, Some(1));
    assert_eq!(
        located.ancestors,
        vec![doc.flows[0].id().clone(), from_id(&doc, 0)]
    );
}

#[test]
fn given_choice_moved_into_own_when_branch_when_moving_then_document_unchanged() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("orders-integration.yaml");
    let choice = step_id(&doc, 0, 0);
    let when = editor
        .find(&doc, &choice)
        .map(|l| l.node.children("when")[0].id().clone())
        .expect("when");

    // Act
    let result = editor.move_node(&doc, &choice, &when);

    // Assert
    assert_eq!(result, doc);
}

#[test]
fn given_node_moved_onto_itself_when_moving_then_document_unchanged() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let log = step_id(&doc, 0, 0);

    assert_eq!(editor.move_node(&doc, &log, &log), doc);
}

#[test]
fn given_sibling_steps_when_moving_to_earlier_position_then_reordered() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let log = step_id(&doc, 0, 0);
    let to = step_id(&doc, 0, 1);

    // Act
    let result = editor.move_node(&doc, &to, &log);

    // Assert
    assert_eq!(step_kinds(&result, 0), vec!["ToDefinition", "LogDefinition"]);
    assert!(editor.find(&result, &to).is_some());
}

#[test]
fn given_step_moved_onto_when_branch_then_becomes_first_step_of_branch() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("orders-integration.yaml");
    let log = step_id(&doc, 0, 1);
    let choice = step_id(&doc, 0, 0);
    let when = editor
        .find(&doc, &choice)
        .map(|l| l.node.children("when")[0].id().clone())
        .expect("when");

    // Act
    let result = editor.move_node(&doc, &log, &when);

    // Assert
    let when_node = editor.find(&result, &when).expect("when").node;
    let kinds: Vec<&str> = when_node.children("steps").iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec!["LogDefinition", "ToDefinition"]);
    assert_eq!(step_kinds(&result, 0), vec!["ChoiceDefinition"]);
}

#[test]
fn given_top_level_routes_when_moving_second_onto_first_then_swapped() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let first = doc.flows[0].id().clone();
    let second = doc.flows[1].id().clone();

    let result = editor.move_node(&doc, &second, &first);

    assert_eq!(result.flows[0].id(), &second);
    assert_eq!(result.flows[1].id(), &first);
}

#[test]
fn given_replacement_with_same_identity_when_updating_then_node_replaced() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let log_id = step_id(&doc, 0, 0);
    let mut replacement = editor.find(&doc, &log_id).expect("log").node.clone();
    replacement.set_value("message", "changed".into());

    // Act
    let result = editor.update(&doc, &replacement);

    // Assert
    let log = editor.find(&result, &log_id).expect("log").node;
    assert_eq!(log.str_value("message"), Some("changed"));
    assert_eq!(
        editor.find(&doc, &log_id).expect("original").node.str_value("message"),
        Some("hello")
    );
}

#[test]
fn given_route_when_cloned_without_regeneration_then_equal() {
    let editor = TreeEditor::new(registry());
    let doc = load("orders-integration.yaml");

    let copy = editor.clone_node(&doc.flows[0], false);

    assert_eq!(copy, doc.flows[0]);
}

#[test]
fn given_route_when_cloned_with_regeneration_then_all_ids_fresh_and_content_equal() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let codec = Codec::new(registry());
    let doc = load("orders-integration.yaml");
    let original = &doc.flows[0];

    // Act
    let copy = editor.clone_node(original, true);

    // Assert
    let old_ids: Vec<&NodeId> = original.descendants().into_iter().map(Node::id).collect();
    for node in copy.descendants() {
        assert!(!old_ids.contains(&node.id()), "identity {} was reused", node.id());
    }
    let as_text = |route: &Node| {
        codec
            .serialize(&Document::plain("x.yaml").with_flows(vec![route.clone()]))
            .expect("serialize")
    };
    assert_eq!(as_text(&copy), as_text(original));
}

#[test]
fn given_navigation_helpers_when_queried_then_route_ids_and_paths_reported() {
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let to = step_id(&doc, 0, 1);

    assert_eq!(editor.route_ids(&doc), vec!["ticker", "audit"]);
    assert!(editor.contains_camel_id(&doc, "audit"));
    assert!(!editor.contains_camel_id(&doc, "missing"));
    assert_eq!(
        editor.top_level_of(&doc, &to).map(|n| n.id()),
        Some(doc.flows[0].id())
    );
    assert_eq!(editor.path_ids(&doc, &to).last(), Some(&to));
}

#[test]
fn given_document_without_beans_when_upserting_then_collection_created() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("timer-log.yaml");
    let bean = Node::new("RegistryBeanDefinition")
        .with_value("name", "clock")
        .with_value("type", "java.time.Clock");

    // Act
    let result = editor.upsert_bean(&doc, bean);

    // Assert
    let beans = result.flows.last().expect("collection");
    assert_eq!(beans.kind(), "Beans");
    assert_eq!(beans.children("beans").len(), 1);
}

#[test]
fn given_bean_with_same_name_when_upserting_then_replaced_not_appended() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("project/orders/consumer.yaml");
    let bean = Node::new("RegistryBeanDefinition")
        .with_value("name", "orderRepository")
        .with_value("type", "com.acme.JdbcOrderRepository");

    // Act
    let result = editor.upsert_bean(&doc, bean);

    // Assert
    let beans = result
        .flows
        .iter()
        .find(|f| f.kind() == "Beans")
        .expect("collection")
        .children("beans");
    assert_eq!(beans.len(), 1);
    assert_eq!(beans[0].str_value("type"), Some("com.acme.JdbcOrderRepository"));
}

#[test]
fn given_last_bean_when_deleted_then_collection_removed() {
    let editor = TreeEditor::new(registry());
    let doc = load("project/orders/consumer.yaml");
    let bean_id = doc
        .flows
        .iter()
        .find(|f| f.kind() == "Beans")
        .map(|c| c.children("beans")[0].id().clone())
        .expect("bean");

    let result = editor.delete_bean(&doc, &bean_id);

    assert_eq!(result.flows.len(), doc.flows.len() - 1);
    assert!(result.flows.iter().all(|f| f.kind() != "Beans"));
}

#[test]
fn given_filter_when_expression_replaced_then_language_switches() {
    // Arrange
    let editor = TreeEditor::new(registry());
    let doc = load("shorthand.yaml");
    let filter_id = step_id(&doc, 0, 1);
    let filter = editor.find(&doc, &filter_id).expect("filter").node;

    // Act
    let changed = editor.with_expression(filter, "jq", ".priority");

    // Assert
    assert_eq!(editor.expression_language(filter), Some("simple"));
    assert_eq!(editor.expression_language(&changed), Some("jq"));
    let jq = changed
        .child("expression")
        .and_then(|e| e.child("jq"))
        .expect("jq");
    assert_eq!(jq.str_value("expression"), Some(".priority"));
}

#[test]
fn given_unknown_language_when_setting_expression_then_node_unchanged() {
    let editor = TreeEditor::new(registry());
    let doc = load("shorthand.yaml");
    let filter_id = step_id(&doc, 0, 1);
    let filter = editor.find(&doc, &filter_id).expect("filter").node;

    let changed = editor.with_expression(filter, "cobol", "x");

    assert_eq!(&changed, filter);
}

use ringwatch_core::{
    account::{Account, AccountStatus, AttributeCategory, AttributeKey},
    link_graph::LinkGraph,
};

fn active(id: &str) -> Account {
    Account::new(id, AccountStatus::Active)
}

fn device(value: &str) -> AttributeKey {
    AttributeKey::new(AttributeCategory::Device, value)
}

#[test]
fn empty_snapshot_builds_empty_graph() {
    let graph = LinkGraph::build(&[]);
    assert!(graph.is_empty());
    assert_eq!(graph.attribute_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn shared_attribute_is_one_node() {
    let accounts = vec![
        active("a").with_device("dev_1").with_ip_asn("AS28573"),
        active("b").with_device("dev_1"),
        active("c"),
    ];
    let graph = LinkGraph::build(&accounts);

    assert_eq!(graph.account_count(), 3);
    assert_eq!(graph.attribute_count(), 2);
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.shared_attribute_count(), 1);
    assert_eq!(graph.accounts_of(&device("dev_1")), vec!["a", "b"]);
    assert!(graph.attributes_of("c").is_empty(), "accounts without attributes stay isolated");
}

#[test]
fn repeated_observation_collapses_to_one_edge() {
    let accounts = vec![active("a").with_device("dev_1").with_device("dev_1")];
    let graph = LinkGraph::build(&accounts);
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn blank_attribute_values_are_ignored() {
    let accounts = vec![
        active("a").with_device("   ").with_payment_instrument(""),
        active("b").with_device(" "),
    ];
    let graph = LinkGraph::build(&accounts);
    assert_eq!(graph.attribute_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn values_are_keyed_per_category() {
    let accounts = vec![
        active("a").with_device("token"),
        active("b").with_payment_instrument("token"),
    ];
    let graph = LinkGraph::build(&accounts);

    assert_eq!(graph.attribute_count(), 2);
    assert_eq!(graph.shared_attribute_count(), 0);
    assert!(graph.attribute_node(&device("token")).is_some());
    assert!(graph
        .attribute_node(&AttributeKey::new(AttributeCategory::IpAsn, "token"))
        .is_none());
}

#[test]
fn repeated_account_ids_merge() {
    let accounts = vec![
        active("a").with_device("dev_1"),
        active("a").with_ip_asn("AS1"),
    ];
    let graph = LinkGraph::build(&accounts);

    assert_eq!(graph.account_count(), 1);
    assert_eq!(graph.attributes_of("a").len(), 2);
}

#[test]
fn graph_does_not_borrow_snapshot() {
    let graph = {
        let accounts = vec![active("a").with_device("dev_1"), active("b").with_device("dev_1")];
        LinkGraph::build(&accounts)
    };
    assert_eq!(graph.accounts_of(&device("dev_1")).len(), 2);
}

#[test]
fn neighborhood_explains_links() {
    let accounts = vec![
        active("multi_acct_sp_1")
            .with_device("dev_shared_SP_A7B8")
            .with_payment_instrument("pix_key_0"),
        active("multi_acct_sp_3").with_device("dev_shared_SP_A7B8"),
        active("multi_acct_sp_2").with_device("dev_shared_SP_A7B8"),
        active("elsewhere").with_device("dev_other"),
    ];
    let graph = LinkGraph::build(&accounts);

    let view = graph.neighborhood("multi_acct_sp_1").unwrap();
    assert_eq!(view.links.len(), 2);
    assert_eq!(view.links[0].attribute, device("dev_shared_SP_A7B8"));
    assert_eq!(view.links[0].co_accounts, vec!["multi_acct_sp_2", "multi_acct_sp_3"]);
    assert!(view.links[1].co_accounts.is_empty(), "private PIX key links nobody");
    assert_eq!(view.linked_accounts(), vec!["multi_acct_sp_2", "multi_acct_sp_3"]);

    assert!(graph.neighborhood("ghost").is_none());
}

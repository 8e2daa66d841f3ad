use std::collections::BTreeMap;

use crate::network::{Flow, Link, Network};

pub fn path(nodes: &[&str]) -> Vec<String> {
    nodes.iter().map(|n| n.to_string()).collect()
}

pub fn demand(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(f, d)| (f.to_string(), *d)).collect()
}

/// Three links with capacities 600, 500 and 1500, one flow of 100 with a
/// disjoint path over each link.
pub fn toy_network() -> Network {
    let links = vec![
        Link::new("A", "B", 600.0),
        Link::new("A", "C", 500.0),
        Link::new("A", "D", 1500.0),
    ];
    let flows = vec![Flow::new(
        "AX",
        vec![path(&["A", "B"]), path(&["A", "C"]), path(&["A", "D"])],
    )];
    Network::new(links, flows, &demand(&[("AX", 100.0)])).unwrap()
}

/// Two flows sharing the link AB on one of their paths.
pub fn shared_link_network() -> Network {
    let links = vec![
        Link::new("A", "B", 100.0),
        Link::new("B", "D", 100.0),
        Link::new("A", "C", 80.0),
        Link::new("C", "D", 80.0),
        Link::new("B", "E", 50.0),
        Link::new("A", "E", 30.0),
    ];
    let flows = vec![
        Flow::new("AD", vec![path(&["A", "B", "D"]), path(&["A", "C", "D"])]),
        Flow::new("AE", vec![path(&["A", "B", "E"]), path(&["A", "E"])]),
    ];
    Network::new(links, flows, &demand(&[("AD", 100.0), ("AE", 40.0)]))
        .unwrap()
}

/// Both paths of the only flow cross AB, whose capacity is below the demand.
pub fn overloaded_network() -> Network {
    let links = vec![
        Link::new("A", "B", 50.0),
        Link::new("B", "C", 500.0),
        Link::new("B", "D", 500.0),
        Link::new("D", "C", 500.0),
    ];
    let flows = vec![Flow::new(
        "AC",
        vec![path(&["A", "B", "C"]), path(&["A", "B", "D", "C"])],
    )];
    Network::new(links, flows, &demand(&[("AC", 100.0)])).unwrap()
}

/// The first path of flow AD runs through the loop A-B-C-A and crosses AB
/// twice.
pub fn looped_path_network() -> Network {
    let links = vec![
        Link::new("A", "B", 100.0),
        Link::new("B", "C", 100.0),
        Link::new("C", "A", 100.0),
        Link::new("B", "D", 100.0),
        Link::new("A", "D", 100.0),
    ];
    let flows = vec![Flow::new(
        "AD",
        vec![path(&["A", "B", "C", "A", "B", "D"]), path(&["A", "D"])],
    )];
    Network::new(links, flows, &demand(&[("AD", 60.0)])).unwrap()
}

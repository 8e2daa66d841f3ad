use std::collections::BTreeMap;

use super::*;
use crate::test_utils::*;

#[test]
fn test_incidence_index() {
    let network = toy_network();
    assert_eq!(network.num_links(), 3);
    assert_eq!(network.num_flows(), 1);
    for link in network.link_ids() {
        assert_eq!(
            network.link_paths(link),
            &[PathRef {
                flow: FlowId(0),
                path: link.0,
            }]
        );
    }
    assert_eq!(
        network.path_links(PathRef {
            flow: FlowId(0),
            path: 2
        }),
        &[LinkId(2)]
    );
}

#[test]
fn test_incidence_matches_pairwise_scan() {
    for network in [shared_link_network(), looped_path_network()] {
        assert_incidence_matches_pairwise_scan(&network);
    }
}

fn assert_incidence_matches_pairwise_scan(network: &Network) {
    for link in network.link_ids() {
        let Link { start, end, .. } = network.link(link);
        let scanned = network
            .flow_ids()
            .flat_map(|flow| {
                network.flow(flow).paths.iter().enumerate().filter_map(
                    move |(p, nodes)| {
                        nodes
                            .windows(2)
                            .any(|w| &w[0] == start && &w[1] == end)
                            .then_some(PathRef { flow, path: p })
                    },
                )
            })
            .collect_vec();
        assert_eq!(network.link_paths(link), scanned.as_slice());
    }
}

#[test]
fn test_looped_path_crosses_link_once() {
    let network = looped_path_network();
    let looped = PathRef {
        flow: FlowId(0),
        path: 0,
    };
    assert_eq!(
        network.path_links(looped),
        &[LinkId(0), LinkId(1), LinkId(2), LinkId(3)]
    );
    assert_eq!(network.link_paths(LinkId(0)), &[looped]);
    let traffic = network.link_traffic(&[[1.0, 0.0]]);
    assert_eq!(traffic[0], 60.0);
    assert_eq!(traffic[4], 0.0);
}

#[test]
fn test_hops_outside_topology_are_skipped() {
    let links = vec![Link::new("A", "B", 10.0)];
    let flows = vec![Flow::new("AC", vec![path(&["A", "B", "C"]), path(&["A", "C"])])];
    let network =
        Network::new(links, flows, &demand(&[("AC", 4.0)])).unwrap();
    assert_eq!(
        network.path_links(PathRef {
            flow: FlowId(0),
            path: 0
        }),
        &[LinkId(0)]
    );
    assert!(network
        .path_links(PathRef {
            flow: FlowId(0),
            path: 1
        })
        .is_empty());
}

#[test]
fn test_link_traffic() {
    let network = shared_link_network();
    let traffic = network.link_traffic(&network.even_split());
    // AB carries half of both flows
    assert_eq!(traffic[0], 0.5 * 100.0 + 0.5 * 40.0);
    assert_eq!(traffic.len(), network.num_links());
}

#[test]
fn test_empty_network() {
    let result = Network::new(
        vec![Link::new("A", "B", 10.0)],
        vec![],
        &BTreeMap::new(),
    );
    assert_eq!(
        result.unwrap_err(),
        ModelError::EmptyNetwork { links: 1, flows: 0 }
    );
    let result = Network::new(
        vec![],
        vec![Flow::new("AB", vec![path(&["A", "B"])])],
        &demand(&[("AB", 1.0)]),
    );
    assert!(matches!(
        result.unwrap_err(),
        ModelError::EmptyNetwork { links: 0, flows: 1 }
    ));
}

#[test]
fn test_invalid_inputs() {
    let flows = || vec![Flow::new("AB", vec![path(&["A", "B"])])];
    assert_eq!(
        Network::new(
            vec![Link::new("A", "B", 0.0)],
            flows(),
            &demand(&[("AB", 1.0)])
        )
        .unwrap_err(),
        ModelError::NonPositiveCapacity("AB".into(), 0.0)
    );
    assert_eq!(
        Network::new(
            vec![Link::new("A", "B", 1.0), Link::new("A", "B", 2.0)],
            flows(),
            &demand(&[("AB", 1.0)])
        )
        .unwrap_err(),
        ModelError::DuplicateLink("AB".into())
    );
    assert_eq!(
        Network::new(vec![Link::new("A", "B", 1.0)], flows(), &BTreeMap::new())
            .unwrap_err(),
        ModelError::MissingDemand("AB".into())
    );
    assert_eq!(
        Network::new(
            vec![Link::new("A", "B", 1.0)],
            flows(),
            &demand(&[("AB", -1.0)])
        )
        .unwrap_err(),
        ModelError::NegativeDemand("AB".into(), -1.0)
    );
    assert!(matches!(
        Network::new(
            vec![Link::new("A", "B", 1.0)],
            vec![Flow::new("AA", vec![path(&["A", "B", "A"])])],
            &demand(&[("AA", 1.0)])
        )
        .unwrap_err(),
        ModelError::InvalidPath { .. }
    ));
    assert_eq!(
        Network::new(
            vec![Link::new("A", "B", 1.0)],
            vec![Flow::new("AB", vec![])],
            &demand(&[("AB", 1.0)])
        )
        .unwrap_err(),
        ModelError::FlowWithoutPaths("AB".into())
    );
}

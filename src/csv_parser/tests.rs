use super::*;

#[test]
fn test_parse_path() {
    assert_eq!(parse_path("[A;B;C]"), vec!["A", "B", "C"]);
    assert_eq!(parse_path("A;B"), vec!["A", "B"]);
}

#[test]
fn test_read_links() {
    let links = read_links("data/test/links.csv").unwrap();
    assert_eq!(links.len(), 8);
    assert_eq!(links[0], Link::new("A", "B", 600.0));
    assert_eq!(links[7], Link::new("F", "G", 1500.0));
}

#[test]
fn test_read_compressed_links() {
    assert_eq!(
        read_links("data/test/links.csv.gz").unwrap(),
        read_links("data/test/links.csv").unwrap()
    );
}

#[test]
fn test_read_flows() {
    let flows = read_flows("data/test/flow-path-day1.csv").unwrap();
    assert_eq!(flows.keys().collect_vec(), vec![&1000, &1300]);
    let first = &flows[&1000];
    // AB only has a single path
    assert_eq!(first.keys().collect_vec(), vec!["AG", "BG"]);
    assert_eq!(
        first["AG"],
        vec![
            parse_path("[A;B;D;G]"),
            parse_path("[A;B;E;G]"),
            parse_path("[A;C;F;G]")
        ]
    );
    assert_eq!(flows[&1300]["AG"].len(), 2);
}

#[test]
fn test_read_traffic() {
    let traffic = read_traffic("data/test/flow-traffic-day1.csv").unwrap();
    // the first record of a flow wins
    assert_eq!(traffic[&1000]["AG"], 100.0);
    assert_eq!(traffic[&1000]["BG"], 50.0);
    assert_eq!(traffic[&1000]["AB"], 10.0);
    assert_eq!(traffic[&1300]["AG"], 300.0);
}

#[test]
fn test_utilization_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out").join("utilization.csv");
    let link = |name: &str, utilization: f64| LinkUtilization {
        link: name.to_string(),
        traffic: utilization,
        capacity: 100.0,
        utilization,
    };
    utilization_to_csv(
        &[
            (1000, vec![link("AB", 10.0), link("AC", 20.0)]),
            (1300, vec![link("AB", 30.0)]),
        ],
        &out,
    )
    .unwrap();
    let df = CsvReader::from_path(&out)
        .unwrap()
        .has_header(true)
        .finish()
        .unwrap();
    assert_eq!(df.height(), 3);
    assert_eq!(
        df.get_column_names(),
        vec!["timestamp", "link", "traffic", "capacity", "utilization"]
    );
}

#[test]
fn test_timestamps_sort_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let paths = dir.path().join("flow-path-day1.csv");
    fs::write(
        &paths,
        "1000,A,B,[A;B]\n1000,A,B,[A;C;B]\n900,A,B,[A;B]\n900,A,B,[A;C;B]\n",
    )
    .unwrap();
    let flows = read_flows(&paths).unwrap();
    assert_eq!(flows.keys().collect_vec(), vec![&900, &1000]);

    let traffic_file = dir.path().join("flow-traffic-day1.csv");
    fs::write(&traffic_file, "1000,A,B,5\n900,A,B,7\n").unwrap();
    let traffic = read_traffic(&traffic_file).unwrap();
    assert_eq!(traffic.keys().collect_vec(), vec![&900, &1000]);
    assert_eq!(traffic[&900]["AB"], 7.0);
}

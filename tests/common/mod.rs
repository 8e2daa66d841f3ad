use split_ratio_optimizer::datastructures::*;
use std::path::{Path, PathBuf};

pub fn default_config(out_dir: &Path) -> Config {
    Config {
        dataset_path: PathBuf::from("data/test"),
        day: 1,
        links_file: "links.csv.gz".to_string(),
        timestamps: vec![],
        out_dir: out_dir.to_path_buf(),
        model: OptimizationVariant::AverageUtilization,
        backend: BackendKind::Clarabel,
        significance_threshold: 10.0,
        write_lp: true,
        gurobi_log_file: out_dir.join("gurobi.log"),
    }
}

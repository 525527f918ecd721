use approx::assert_relative_eq;
use lbtree::lb::{
    LbConfig, LbError, LbOptions, SequenceAnnotation, calculate_lb_values,
    calculate_lb_values_from_newick, set_lb_values,
};
use lbtree::model::MalformedTreeError;
use lbtree::newick::parse_str;
use std::collections::HashMap;
use std::path::Path;

/// Branch lengths in substitutions per site
const PER_SITE_TREE: &str = "((seq1:0.0031,seq2:0.0044)anc1:0.0028,(seq3:0.0012,seq4:0.0057)anc2:0.0035,seq5:0.0101)naive;";

/// Branch lengths in substitution counts
const COUNT_TREE: &str = "((seq1:3,seq2:5)anc1:2,seq3:8)naive;";

fn config_without_rescale() -> LbConfig {
    let mut config = LbConfig::default();
    config.rescale.enabled = false;
    config
}

// ============= Entry Point Tests =============
#[test]
fn test_default_calculation() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let config = LbConfig::default();
    let result = calculate_lb_values(&tree, &config, None).unwrap();

    let lbi = set_lb_values(&tree, config.lbi_tau, &LbOptions::default()).unwrap();
    let lbr = set_lb_values(&tree, config.effective_lbr_tau(), &LbOptions::default()).unwrap();
    assert_eq!(result.lbi, lbi.lbi_by_label(&tree));
    assert_eq!(result.lbr, lbr.lbr_by_label(&tree));
    assert_eq!(result.newick, PER_SITE_TREE);
}

#[test]
fn test_every_label_has_values() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let result = calculate_lb_values(&tree, &LbConfig::default(), None).unwrap();

    assert_eq!(result.lbi.len(), tree.num_vertices());
    assert_eq!(result.lbr.len(), tree.num_vertices());
    for label in tree.labels() {
        assert!(result.lbi.contains_key(label));
        assert!(result.lbr.contains_key(label));
    }
    assert_eq!(result.lbr["naive"], 0.0);
}

#[test]
fn test_lbr_tau_override() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let config = LbConfig {
        lbr_tau: Some(0.01),
        ..LbConfig::default()
    };
    let result = calculate_lb_values(&tree, &config, None).unwrap();
    let lbr = set_lb_values(&tree, 0.01, &LbOptions::default()).unwrap();
    assert_eq!(result.lbr, lbr.lbr_by_label(&tree));
}

#[test]
fn test_normalization_applies_to_lbi_only() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let plain = calculate_lb_values(&tree, &LbConfig::default(), None).unwrap();
    let config = LbConfig {
        normalize: true,
        ..LbConfig::default()
    };
    let normalized = calculate_lb_values(&tree, &config, None).unwrap();

    let max = normalized.lbi.values().copied().fold(0.0, f64::max);
    assert_relative_eq!(max, 1.0, max_relative = 1e-12);
    assert_eq!(normalized.lbr, plain.lbr);
}

#[test]
fn test_dummy_augmentation_in_config() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let config = LbConfig {
        add_dummy_root: true,
        add_dummy_leaves: true,
        ..LbConfig::default()
    };
    let result = calculate_lb_values(&tree, &config, None).unwrap();

    // Dummies are not reported
    assert_eq!(result.lbi.len(), tree.num_vertices());
    assert!(result.lbi.keys().all(|label| !label.starts_with("dummy-")));
    assert!(result.lbr["naive"] > 0.0);
    assert_eq!(result.newick, PER_SITE_TREE);
}

// ============= Rescaling Tests =============
#[test]
fn test_rescale_needs_sequence_lengths() {
    let tree = parse_str(COUNT_TREE).unwrap();
    let result = calculate_lb_values(&tree, &LbConfig::default(), None);
    match result {
        Err(LbError::MissingRescaleInfo {
            mean_leaf_depth,
            threshold,
        }) => {
            assert_relative_eq!(mean_leaf_depth, (5.0 + 7.0 + 8.0) / 3.0);
            assert_eq!(threshold, 1.0);
        }
        other => panic!("expected MissingRescaleInfo, got {:?}", other),
    }

    let empty = SequenceAnnotation::new();
    assert!(matches!(
        calculate_lb_values(&tree, &LbConfig::default(), Some(&empty)),
        Err(LbError::MissingRescaleInfo { .. })
    ));
}

#[test]
fn test_rescale_by_mean_sequence_length() {
    let tree = parse_str(COUNT_TREE).unwrap();
    let annotation = SequenceAnnotation::new().with_sequence_lengths(vec![380, 420]);
    let result = calculate_lb_values(&tree, &LbConfig::default(), Some(&annotation)).unwrap();

    let mut scaled = tree.clone();
    scaled.scale_branch_lengths(1.0 / 400.0);
    let expected = calculate_lb_values(&scaled, &config_without_rescale(), None).unwrap();
    assert_eq!(result, expected);

    // The input tree is left as it was
    assert_eq!(tree.to_newick(Default::default()), COUNT_TREE);
    let reparsed = parse_str(&result.newick).unwrap();
    assert_relative_eq!(reparsed.mean_leaf_depth(), 20.0 / 3.0 / 400.0, max_relative = 1e-12);
}

#[test]
fn test_rescale_disabled_or_below_threshold() {
    let tree = parse_str(COUNT_TREE).unwrap();
    let result = calculate_lb_values(&tree, &config_without_rescale(), None).unwrap();
    assert_eq!(result.newick, COUNT_TREE);

    let mut config = LbConfig::default();
    config.rescale.mean_leaf_depth_threshold = 10.0;
    assert!(calculate_lb_values(&tree, &config, None).is_ok());
}

// ============= Multiplicity Tests =============
#[test]
fn test_multiplicities_from_annotation_match_tree_annotations() {
    let config = LbConfig {
        use_multiplicities: true,
        ..LbConfig::default()
    };
    let annotated = "((seq1[&multiplicity=3]:0.0031,seq2:0.0044)anc1:0.0028,seq3[&multiplicity=2]:0.0012)naive;";
    let from_tree = calculate_lb_values_from_newick(annotated, &config, None).unwrap();

    let plain = "((seq1:0.0031,seq2:0.0044)anc1:0.0028,seq3:0.0012)naive;";
    let multiplicities = HashMap::from([("seq1".to_string(), 3.0), ("seq3".to_string(), 2.0)]);
    let annotation = SequenceAnnotation::new().with_multiplicities(multiplicities);
    let from_map = calculate_lb_values_from_newick(plain, &config, Some(&annotation)).unwrap();

    assert_eq!(from_tree.lbi, from_map.lbi);
    assert_eq!(from_tree.lbr, from_map.lbr);

    let unweighted = calculate_lb_values_from_newick(plain, &LbConfig::default(), None).unwrap();
    assert!(from_map.lbi["seq1"] > unweighted.lbi["seq1"]);
}

#[test]
fn test_multiplicities_without_source() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let config = LbConfig {
        use_multiplicities: true,
        ..LbConfig::default()
    };
    assert!(matches!(
        calculate_lb_values(&tree, &config, None),
        Err(LbError::InvalidConfiguration(_))
    ));
    let lengths_only = SequenceAnnotation::new().with_sequence_lengths(vec![300]);
    assert!(matches!(
        calculate_lb_values(&tree, &config, Some(&lengths_only)),
        Err(LbError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_invalid_multiplicity() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let config = LbConfig {
        use_multiplicities: true,
        ..LbConfig::default()
    };
    let annotation = SequenceAnnotation::new()
        .with_multiplicities(HashMap::from([("seq1".to_string(), 0.0)]));
    assert!(matches!(
        calculate_lb_values(&tree, &config, Some(&annotation)),
        Err(LbError::InvalidConfiguration(_))
    ));
}

// ============= Configuration Tests =============
#[test]
fn test_config_from_file() {
    let path = Path::new("tests").join("fixtures").join("lb_config.toml");
    let config = LbConfig::from_toml_file(path).unwrap();

    assert_eq!(config.lbi_tau, 0.004);
    assert_relative_eq!(config.effective_lbr_tau(), 0.1);
    assert!(config.use_multiplicities);
    assert!(config.add_dummy_root);
    assert!(!config.add_dummy_leaves);
    assert!(config.normalize);
    assert!(config.rescale.enabled);
    assert_eq!(config.rescale.mean_leaf_depth_threshold, 0.5);

    let annotated = "((seq1[&multiplicity=3]:0.0031,seq2:0.0044)anc1:0.0028,seq3:0.0012)naive;";
    let result = calculate_lb_values_from_newick(annotated, &config, None).unwrap();
    let max = result.lbi.values().copied().fold(0.0, f64::max);
    assert_relative_eq!(max, 1.0, max_relative = 1e-12);
}

#[test]
fn test_invalid_config() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let config = LbConfig {
        add_dummy_leaves: true,
        ..LbConfig::default()
    };
    assert!(matches!(
        calculate_lb_values(&tree, &config, None),
        Err(LbError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        calculate_lb_values(&tree, &LbConfig::with_tau(0.0), None),
        Err(LbError::InvalidConfiguration(_))
    ));
}

// ============= Error Tests =============
#[test]
fn test_parsing_error_surfaces() {
    let result = calculate_lb_values_from_newick("((A:1,B:1)AB:1,C:2", &LbConfig::default(), None);
    assert!(matches!(result, Err(LbError::Parsing(_))));
}

#[test]
fn test_malformed_tree() {
    let result = calculate_lb_values_from_newick(
        "((A:0.001,B:0.001)X:0.001,A:0.002)R;",
        &LbConfig::default(),
        None,
    );
    assert!(matches!(
        result,
        Err(LbError::MalformedTree(MalformedTreeError::DuplicateLabel(_)))
    ));
}

#[test]
fn test_result_serializes_to_json() {
    let tree = parse_str(PER_SITE_TREE).unwrap();
    let result = calculate_lb_values(&tree, &LbConfig::default(), None).unwrap();
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert!(json["lbi"]["seq1"].is_f64());
    assert!(json["lbr"]["anc1"].is_f64());
    assert_eq!(json["newick"], PER_SITE_TREE);
}

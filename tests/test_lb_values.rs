use approx::{assert_abs_diff_eq, assert_relative_eq};
use lbtree::lb::augment::{DUMMY_LEAF_PREFIX, DUMMY_ROOT_LABEL};
use lbtree::lb::{LbError, LbOptions, augment_tree, set_lb_values};
use lbtree::model::vertex::BranchLength;
use lbtree::model::{MalformedTreeError, PhyloTree, VertexIndex};
use lbtree::newick::parse_str;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const HAND_TOLERANCE: f64 = 1e-9;

/// Fixed tree with three levels of nesting and varied branch lengths
const NESTED_TREE: &str = "((((s1:0.3,s2:0.4)a1:0.2,s3:1.1)a2:0.5,(s4:0.2,s5:0.25,s6:0.3)a3:0.8)a4:0.3,\
                           (s7:1.5,(s8:0.1,s9:0.6)a5:0.9)a6:0.4,s10:2.0)root;";

/// Builds a random tree by repeatedly merging two or three random subtrees.
fn random_tree(rng: &mut StdRng, num_leaves: usize) -> PhyloTree {
    let mut tree = PhyloTree::new(2 * num_leaves);
    let mut pool: Vec<VertexIndex> = (0..num_leaves)
        .map(|i| {
            let length = rng.gen_range(0.01..1.0);
            tree.add_leaf(Some(BranchLength::new(length)), format!("leaf{i}"))
        })
        .collect();

    let mut next_internal = 0;
    while pool.len() > 3 {
        let arity = rng.gen_range(2..=3).min(pool.len() - 1);
        let children: Vec<VertexIndex> = (0..arity)
            .map(|_| pool.swap_remove(rng.gen_range(0..pool.len())))
            .collect();
        let length = rng.gen_range(0.01..1.0);
        let internal = tree.add_internal_vertex(
            children,
            Some(BranchLength::new(length)),
            format!("internal{next_internal}"),
        );
        next_internal += 1;
        pool.push(internal);
    }
    tree.add_root(pool, None, "root".to_string());
    tree
}

fn index(tree: &PhyloTree, label: &str) -> VertexIndex {
    tree.index_of_label(label).unwrap()
}

fn growth(branch_length: f64, tau: f64) -> f64 {
    tau * (1.0 - (-branch_length / tau).exp())
}

/// Spearman rank correlation of two samples without ties.
fn rank_correlation(a: &[f64], b: &[f64]) -> f64 {
    let ranks = |values: &[f64]| {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
        let mut ranks = vec![0.0; values.len()];
        for (rank, &i) in order.iter().enumerate() {
            ranks[i] = rank as f64;
        }
        ranks
    };
    let (ra, rb) = (ranks(a), ranks(b));
    let n = a.len() as f64;
    let d2: f64 = ra.iter().zip(&rb).map(|(x, y)| (x - y).powi(2)).sum();
    1.0 - 6.0 * d2 / (n * (n * n - 1.0))
}

// ============= Closed Form Tests =============
#[test]
fn test_star_tree_closed_form() {
    let tau = 0.3;
    let b = 0.45;
    let multiplicity = 3.0;
    let mut tree = parse_str("(A:0.45,B:0.45,C:0.45,D:0.45)R;").unwrap();
    for leaf in tree.leaf_indices() {
        tree[leaf].set_multiplicity(multiplicity);
    }
    let options = LbOptions {
        use_multiplicities: true,
        ..LbOptions::default()
    };
    let values = set_lb_values(&tree, tau, &options).unwrap();

    let up = multiplicity * growth(b, tau);
    for leaf in tree.leaf_indices() {
        assert_relative_eq!(values.up_polarizer(leaf), up, max_relative = 1e-12);
    }
    let root = tree.root_index();
    let sum_up: f64 = tree.leaf_indices().iter().map(|&l| values.up_polarizer(l)).sum();
    assert_relative_eq!(values.lbi(root), sum_up, max_relative = 1e-12);
    assert_relative_eq!(values.lbi(root), 4.0 * up, max_relative = 1e-12);
}

#[test]
fn test_hand_computed_asymmetric_tree() {
    let tree = parse_str("((B:0.5,C:0.5)A:1.0,D:2.0,E:0.1)root;").unwrap();
    let tau = 1.0;
    let values = set_lb_values(&tree, tau, &LbOptions::default()).unwrap();
    let e = |x: f64| (-x).exp();
    let f = |x: f64| growth(x, tau);

    // Upward messages
    let up_b = f(0.5);
    let up_c = f(0.5);
    let up_a = e(1.0) * (up_b + up_c) + f(1.0);
    let up_d = f(2.0);
    let up_e = f(0.1);

    // Downward messages
    let down_a = (up_d + up_e) * e(1.0) + f(1.0);
    let down_d = (up_a + up_e) * e(2.0) + f(2.0);
    let down_e = (up_a + up_d) * e(0.1) + f(0.1);
    let down_b = (down_a + up_c) * e(0.5) + f(0.5);
    let down_c = (down_a + up_b) * e(0.5) + f(0.5);

    let expected = [
        ("root", up_a + up_d + up_e, 0.0),
        ("A", down_a + up_b + up_c, (up_b + up_c) / down_a),
        ("B", down_b, 0.0),
        ("C", down_c, 0.0),
        ("D", down_d, 0.0),
        ("E", down_e, 0.0),
    ];
    for (label, lbi, lbr) in expected {
        let i = index(&tree, label);
        assert_abs_diff_eq!(values.lbi(i), lbi, epsilon = HAND_TOLERANCE);
        assert_abs_diff_eq!(values.lbr(i), lbr, epsilon = HAND_TOLERANCE);
    }

    assert_abs_diff_eq!(values.up_polarizer(index(&tree, "A")), up_a, epsilon = HAND_TOLERANCE);
    assert_abs_diff_eq!(values.down_polarizer(index(&tree, "B")), down_b, epsilon = HAND_TOLERANCE);
    assert_eq!(values.clock_length(tree.root_index()), 0.0);
    assert_abs_diff_eq!(values.clock_length(index(&tree, "D")), 2.0, epsilon = HAND_TOLERANCE);
}

#[test]
fn test_values_by_label() {
    let tree = parse_str("((B:0.5,C:0.5)A:1.0,D:2.0,E:0.1)root;").unwrap();
    let values = set_lb_values(&tree, 1.0, &LbOptions::default()).unwrap();

    let lbi = values.lbi_by_label(&tree);
    let lbr = values.lbr_by_label(&tree);
    assert_eq!(lbi.len(), 6);
    assert_eq!(lbr.len(), 6);
    assert_eq!(lbi["A"], values.lbi(index(&tree, "A")));
    assert_eq!(lbr["root"], 0.0);
    assert_eq!(values.len(), tree.num_vertices());
    assert_eq!(values.tau(), 1.0);
}

#[test]
fn test_zero_branch_lengths() {
    let tree = parse_str("(A:0,B:0)R;").unwrap();
    let options = LbOptions {
        normalize: true,
        ..LbOptions::default()
    };
    let values = set_lb_values(&tree, 1.0, &options).unwrap();
    assert!(values.lbi_values().iter().all(|&lbi| lbi == 0.0));
    assert!(values.lbr_values().iter().all(|&lbr| lbr == 0.0));
}

#[test]
fn test_single_vertex_tree() {
    let tree = parse_str("naive;").unwrap();
    let values = set_lb_values(&tree, 1.0, &LbOptions::default()).unwrap();
    assert_eq!(values.lbi(0), 0.0);
    assert_eq!(values.lbr(0), 0.0);
}

#[test]
fn test_tiny_sibling_message_not_cancelled() {
    let tree = parse_str("((a:5,b:5)X:0,L:1e-17)R;").unwrap();
    let values = set_lb_values(&tree, 1.0, &LbOptions::default()).unwrap();
    let x = index(&tree, "X");
    let up_l = values.up_polarizer(index(&tree, "L"));

    assert!(up_l > 0.0);
    assert_relative_eq!(values.down_polarizer(x), up_l, max_relative = 1e-12);
    let children_up = 2.0 * growth(5.0, 1.0);
    assert_relative_eq!(values.lbr(x), children_up / up_l, max_relative = 1e-9);
}

#[test]
fn test_polarizers_with_dummy_root() {
    let tree = parse_str("(A:1,B:1)R;").unwrap();
    let options = LbOptions {
        add_dummy_root: true,
        dummy_branch_length: Some(2.0),
        ..LbOptions::default()
    };
    let values = set_lb_values(&tree, 1.0, &options).unwrap();
    let r = tree.root_index();

    // The root hangs below the dummy root on a branch of length 2
    assert_eq!(values.len(), tree.num_vertices());
    assert_abs_diff_eq!(values.down_polarizer(r), growth(2.0, 1.0), epsilon = HAND_TOLERANCE);
    let up_r = (-2.0f64).exp() * 2.0 * growth(1.0, 1.0) + growth(2.0, 1.0);
    assert_abs_diff_eq!(values.up_polarizer(r), up_r, epsilon = HAND_TOLERANCE);
    assert_abs_diff_eq!(values.clock_length(r), 2.0, epsilon = HAND_TOLERANCE);
}

// ============= Property Tests =============
#[test]
fn test_lbr_of_root_is_zero() {
    let mut rng = StdRng::seed_from_u64(11);
    for size in [2, 5, 20, 60] {
        let tree = random_tree(&mut rng, size);
        let values = set_lb_values(&tree, 0.4, &LbOptions::default()).unwrap();
        assert_eq!(values.lbr(tree.root_index()), 0.0);
        assert_eq!(values.down_polarizer(tree.root_index()), 0.0);
        assert!(values.lbi_values().iter().all(|&lbi| lbi >= 0.0));
        assert!(values.lbr_values().iter().all(|&lbr| lbr >= 0.0));
    }
}

#[test]
fn test_root_lbi_monotone_in_tau() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..10 {
        let num_leaves = rng.gen_range(2..40);
        let tree = random_tree(&mut rng, num_leaves);

        let mut tau = 0.01;
        let mut previous = 0.0;
        while tau < 20.0 {
            let values = set_lb_values(&tree, tau, &LbOptions::default()).unwrap();
            let lbi = values.lbi(tree.root_index());
            assert!(
                lbi >= previous - 1e-12,
                "LBI of root dropped from {previous} to {lbi} at tau {tau}"
            );
            previous = lbi;
            tau *= 1.0 + rng.gen_range(0.05..0.5);
        }
    }
}

#[test]
fn test_normalized_maximum_is_one() {
    let mut rng = StdRng::seed_from_u64(5);
    let options = LbOptions {
        normalize: true,
        ..LbOptions::default()
    };
    for _ in 0..5 {
        let tree = random_tree(&mut rng, 25);
        let values = set_lb_values(&tree, 0.2, &options).unwrap();
        assert_relative_eq!(values.max_lbi(), 1.0, max_relative = 1e-12);
        assert!(values.lbi_values().iter().all(|&lbi| (0.0..=1.0).contains(&lbi)));
    }
}

#[test]
fn test_normalized_lbi_invariant_under_scaling() {
    let mut rng = StdRng::seed_from_u64(77);
    let tree = random_tree(&mut rng, 30);
    let tau = 0.25;
    let options = LbOptions {
        normalize: true,
        ..LbOptions::default()
    };
    let reference = set_lb_values(&tree, tau, &options).unwrap();

    // LBI depends on branch lengths only relative to tau
    for factor in [1e-3, 0.5, 7.0, 250.0] {
        let mut scaled = tree.clone();
        scaled.scale_branch_lengths(factor);
        let values = set_lb_values(&scaled, tau * factor, &options).unwrap();
        for (expected, actual) in reference.lbi_values().iter().zip(values.lbi_values()) {
            assert_relative_eq!(*actual, *expected, max_relative = 1e-9);
        }
    }
}

#[test]
fn test_multiplicity_linearity() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut tree = random_tree(&mut rng, 20);
    for i in 0..tree.num_vertices() {
        let multiplicity = rng.gen_range(1..6) as f64;
        tree[i].set_multiplicity(multiplicity);
    }
    let mut doubled = tree.clone();
    for i in 0..doubled.num_vertices() {
        let multiplicity = doubled[i].multiplicity();
        doubled[i].set_multiplicity(2.0 * multiplicity);
    }

    let options = LbOptions {
        use_multiplicities: true,
        ..LbOptions::default()
    };
    let single = set_lb_values(&tree, 0.3, &options).unwrap();
    let double = set_lb_values(&doubled, 0.3, &options).unwrap();
    for i in 0..tree.num_vertices() {
        assert_relative_eq!(double.lbi(i), 2.0 * single.lbi(i), max_relative = 1e-12);
        assert_relative_eq!(double.lbr(i), single.lbr(i), max_relative = 1e-12);
    }
}

#[test]
fn test_multiplicities_ignored_unless_requested() {
    let plain = parse_str("((A:1,B:1)AB:1,C:2)R;").unwrap();
    let mut weighted = plain.clone();
    let a = index(&weighted, "A");
    weighted[a].set_multiplicity(10.0);

    let options = LbOptions::default();
    let lbi_plain = set_lb_values(&plain, 1.0, &options).unwrap();
    let lbi_weighted = set_lb_values(&weighted, 1.0, &options).unwrap();
    assert_eq!(lbi_plain, lbi_weighted);
}

#[test]
fn test_input_tree_unchanged() {
    let tree = parse_str(NESTED_TREE).unwrap();
    let before = tree.to_newick(Default::default());
    let options = LbOptions {
        add_dummy_root: true,
        add_dummy_leaves: true,
        normalize: true,
        ..LbOptions::default()
    };
    set_lb_values(&tree, 0.5, &options).unwrap();
    assert_eq!(tree.to_newick(Default::default()), before);
}

// ============= Augmentation Tests =============
#[test]
fn test_augment_tree_structure() {
    let mut tree = parse_str("((A:1,B:1)AB:1,C:2)R;").unwrap();
    let c = index(&tree, "C");
    tree[c].set_multiplicity(4.0);

    let augmented = augment_tree(&tree, 3.0, true, true).unwrap();
    let aug = augmented.tree();
    assert!(aug.validate().is_ok());
    assert_eq!(aug.num_vertices(), tree.num_vertices() + 4);
    assert_eq!(aug.root().label(), DUMMY_ROOT_LABEL);
    assert_eq!(aug.root().children().len(), 1);

    // Original vertices keep their labels and multiplicities
    for vertex in tree.vertices() {
        let copy = &aug[augmented.augmented_index(vertex.index())];
        assert_eq!(copy.label(), vertex.label());
        assert_eq!(copy.multiplicity(), vertex.multiplicity());
        assert!(!copy.is_leaf());
    }

    // The old root hangs below the dummy root
    let r = augmented.augmented_index(tree.root_index());
    assert_eq!(aug[r].parent(), Some(aug.root_index()));
    assert_eq!(*aug[r].branch_length().unwrap(), 3.0);

    // Every old leaf has one dummy child inheriting its multiplicity
    let c_aug = augmented.augmented_index(c);
    let dummy = aug[c_aug].children()[0];
    assert_eq!(aug[dummy].label(), format!("{DUMMY_LEAF_PREFIX}C"));
    assert_eq!(aug[dummy].multiplicity(), 4.0);
    assert_eq!(*aug[dummy].branch_length().unwrap(), 3.0);
    assert_eq!(*aug[c_aug].branch_length().unwrap(), 2.0);

    // The original is untouched
    assert_eq!(tree.num_vertices(), 5);
    assert!(tree[c].is_leaf());
}

#[test]
fn test_augment_root_only() {
    let tree = parse_str("((A:1,B:1)AB:1,C:2)R;").unwrap();
    let augmented = augment_tree(&tree, 1.0, true, false).unwrap();
    assert_eq!(augmented.tree().num_vertices(), 6);
    assert_eq!(augmented.tree().num_leaves(), 3);
    assert_eq!(augmented.index_map().len(), 5);
}

#[test]
fn test_augment_dummy_labels_stay_unique() {
    let tree = parse_str("((dummy-leaf-A:1,A:1)dummy-root:1,C:2)R;").unwrap();
    let augmented = augment_tree(&tree, 1.0, true, true).unwrap();
    let aug = augmented.tree();
    assert!(aug.validate().is_ok());
    assert_eq!(aug.root().label(), "dummy-root-1");
    let a = augmented.augmented_index(index(&tree, "A"));
    assert_eq!(aug[aug[a].children()[0]].label(), "dummy-leaf-A-1");
}

#[test]
fn test_augment_errors() {
    let tree = parse_str("(A:1,B:1)R;").unwrap();
    assert!(matches!(
        augment_tree(&tree, 1.0, false, true),
        Err(LbError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        augment_tree(&tree, 0.0, true, false),
        Err(LbError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        augment_tree(&tree, f64::INFINITY, true, false),
        Err(LbError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_augmentation_removes_zero_boundary_values() {
    let tree = parse_str(NESTED_TREE).unwrap();
    let options = LbOptions {
        add_dummy_root: true,
        add_dummy_leaves: true,
        ..LbOptions::default()
    };
    let values = set_lb_values(&tree, 0.5, &options).unwrap();

    // Values are reported for the original vertices only
    assert_eq!(values.len(), tree.num_vertices());
    assert!(values.lbr(tree.root_index()) > 0.0);
    for leaf in tree.leaf_indices() {
        assert!(values.lbr(leaf) > 0.0);
    }
}

#[test]
fn test_augmentation_preserves_ranking() {
    let tree = parse_str(NESTED_TREE).unwrap();
    for tau in [0.5, 1.0] {
        let plain = set_lb_values(&tree, tau, &LbOptions::default()).unwrap();
        let augmented_with = |length: f64| {
            let options = LbOptions {
                add_dummy_root: true,
                add_dummy_leaves: true,
                dummy_branch_length: Some(length),
                ..LbOptions::default()
            };
            set_lb_values(&tree, tau, &options).unwrap()
        };

        let long = augmented_with(1e3 * tau);
        let longer = augmented_with(1e4 * tau);

        // Converged: a dummy branch this long contributes exactly tau
        for i in 0..tree.num_vertices() {
            assert_relative_eq!(long.lbi(i), longer.lbi(i), max_relative = 1e-9);
        }
        let correlation = rank_correlation(plain.lbi_values(), long.lbi_values());
        assert!(correlation > 0.85, "rank correlation {correlation} at tau {tau}");
    }
}

// ============= Error Tests =============
#[test]
fn test_dummy_leaves_without_root() {
    let tree = parse_str("(A:1,B:1)R;").unwrap();
    let options = LbOptions {
        add_dummy_leaves: true,
        ..LbOptions::default()
    };
    assert!(matches!(
        set_lb_values(&tree, 1.0, &options),
        Err(LbError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_invalid_tau() {
    let tree = parse_str("(A:1,B:1)R;").unwrap();
    for tau in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            set_lb_values(&tree, tau, &LbOptions::default()),
            Err(LbError::InvalidConfiguration(_))
        ));
    }
}

#[test]
fn test_duplicate_label() {
    let tree = parse_str("((A:1,B:1)X:1,A:2)R;").unwrap();
    assert!(matches!(
        set_lb_values(&tree, 1.0, &LbOptions::default()),
        Err(LbError::MalformedTree(MalformedTreeError::DuplicateLabel(_)))
    ));
}

#[test]
fn test_missing_branch_length() {
    let tree = parse_str("((A:1,B)AB:1,C:2)R;").unwrap();
    assert!(matches!(
        set_lb_values(&tree, 1.0, &LbOptions::default()),
        Err(LbError::MalformedTree(MalformedTreeError::MissingBranchLength(label))) if label == "B"
    ));
}

//! End-to-end pipeline test: parse → curate → filter → publish, twice,
//! asserting the remote store converges to each run's local tree.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use opendal::Operator;
use opendal::services::Memory;
use sha2::{Digest, Sha256};

use debslim_core::{
    Codec, CurationPolicy, PackageIndex, Publisher, collect_tree, curate, filter_index,
};

/// Build a synthetic Packages body with `count` entries in the `utils`
/// section, each depending on the next (pkg000 -> pkg001 -> ...).
fn synthetic_index(count: usize) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..count {
        write!(body, "Package: pkg{i:03}\nSection: utils\nVersion: 1.0\n").unwrap();
        if i + 1 < count {
            writeln!(body, "Depends: pkg{:03} (>= 1.0)", i + 1).unwrap();
        }
        body.push('\n');
    }
    body.into_bytes()
}

fn test_policy() -> CurationPolicy {
    let mut policy: CurationPolicy = toml::from_str(
        r#"
        sections = ["utils"]
        force_include = []
        score_threshold = 1000
        "#,
    )
    .unwrap();
    policy.primary_budget = 20;
    policy.dependency_budget = 5;
    policy
}

async fn remote_keys(op: &Operator) -> BTreeSet<String> {
    op.list_with("")
        .recursive(true)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.metadata().mode().is_file())
        .map(|e| e.path().to_string())
        .collect()
}

#[tokio::test]
async fn curate_filter_publish_converges() {
    let raw = Codec::Gzip.compress(&synthetic_index(150)).unwrap();
    let index = PackageIndex::parse(&raw, "Packages.gz").unwrap();
    assert_eq!(index.len(), 150);

    // Only the first three packages are popular enough; the chain pulls in
    // dependencies up to the budget.
    let popcon = [("pkg000", 5000u64), ("pkg001", 4000), ("pkg002", 3000)]
        .iter()
        .map(|(n, s)| ((*n).to_string(), *s))
        .collect();

    let curated = curate(&index, &popcon, &test_policy());
    assert_eq!(curated.primary.len(), 3);
    assert_eq!(curated.dependencies.len(), 5);
    assert!(curated.primary.is_disjoint(&curated.dependencies));
    // BFS from pkg000..pkg002 discovers pkg003..pkg007 before the budget.
    assert!(curated.dependencies.contains("pkg003"));
    assert!(curated.dependencies.contains("pkg007"));
    assert!(!curated.dependencies.contains("pkg008"));

    // Filter the raw index down to the allow-set.
    let allowed = curated
        .allowed()
        .iter()
        .map(|n| n.as_bytes().to_vec())
        .collect();
    let (filtered, stats) = filter_index(&raw, "Packages.gz", &allowed).unwrap();
    assert!(!stats.passthrough);
    assert_eq!(stats.kept, 8);

    // Lay the filtered artifact out as a publishable tree.
    let tree = tempfile::tempdir().unwrap();
    let arch_dir = tree.path().join("dists/trixie/main/binary-amd64");
    std::fs::create_dir_all(&arch_dir).unwrap();
    std::fs::write(arch_dir.join("Packages.gz"), &filtered).unwrap();
    std::fs::write(tree.path().join("dists/trixie/Release"), b"Suite: trixie\n").unwrap();

    let op = Operator::new(Memory::default()).unwrap().finish();
    let publisher = Publisher::new(op.clone());

    let objects = collect_tree(tree.path()).unwrap();
    let local_keys: BTreeSet<String> = objects.iter().map(|o| o.key.clone()).collect();
    let report = publisher.sync(objects).await.unwrap();
    assert_eq!(report.uploaded, 3); // Packages.gz, its by-hash alias, Release
    assert_eq!(remote_keys(&op).await, local_keys);

    let digest1 = hex::encode(Sha256::digest(&filtered));
    let alias1 = format!("dists/trixie/main/binary-amd64/by-hash/SHA256/{digest1}");
    assert!(local_keys.contains(&alias1));

    // Second run: the filtered index changes, so the by-hash alias moves.
    let (refiltered, _) = filter_index(
        &raw,
        "Packages.gz",
        &[b"pkg000".to_vec()].into_iter().collect(),
    )
    .unwrap();
    std::fs::write(arch_dir.join("Packages.gz"), &refiltered).unwrap();

    let objects = collect_tree(tree.path()).unwrap();
    let local_keys2: BTreeSet<String> = objects.iter().map(|o| o.key.clone()).collect();
    let report = publisher.sync(objects).await.unwrap();
    assert_eq!(report.deleted, 1); // the orphaned run-1 alias
    assert_eq!(remote_keys(&op).await, local_keys2);
    assert!(!remote_keys(&op).await.contains(&alias1));
}

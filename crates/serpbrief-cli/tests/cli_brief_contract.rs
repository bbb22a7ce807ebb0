use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn brief_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("serpbrief"));
    // Hermetic: no inherited keys, no env-file, no network.
    cmd.env_remove("SERPAPI_API_KEY")
        .env_remove("SERPBRIEF_ENV_FILE")
        .env_remove("SERPBRIEF_PROXY_API_KEY");
    cmd
}

#[test]
fn brief_from_serp_file_json() {
    let serp = fixture("serp_pm_software.json");
    let out = brief_cmd()
        .args([
            "brief",
            "--keyword",
            "best project management software",
            "--serp-file",
            serp.to_str().unwrap(),
            "--offline",
            "--format",
            "json",
        ])
        .output()
        .expect("run brief");
    assert!(
        out.status.success(),
        "brief failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("brief json");
    assert_eq!(v["keyword"], "best project management software");
    assert_eq!(v["intent"]["label"], "Commercial");
    assert_eq!(
        v["brief"]["title"],
        "best project management software: Top Picks, Comparisons & FAQs"
    );
    assert_eq!(
        v["paa"][0],
        "What is the best project management software?"
    );
    assert_eq!(v["competitor_headings"].as_array().map(Vec::len), Some(0));
    assert_eq!(v["insights"]["serp_patterns"]["result_count"], 3);

    let outline = v["brief"]["outline"].as_array().expect("outline");
    assert_eq!(outline[0]["level"], 1);
    assert_eq!(outline.iter().filter(|n| n["level"] == 1).count(), 1);
    assert!(outline
        .iter()
        .any(|n| n["level"] == 2 && n["title"] == "People Also Ask"));
    assert!(!outline
        .iter()
        .any(|n| n["title"] == "Competitor Heading Themes"));
}

#[test]
fn brief_markdown_to_out_file() {
    let serp = fixture("serp_pm_software.json");
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("briefs").join("pm.md");

    brief_cmd()
        .args([
            "brief",
            "--keyword",
            "best project management software",
            "--serp-file",
            serp.to_str().unwrap(),
            "--offline",
            "--meta",
            "by-intent",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("pm.md"));

    let md = std::fs::read_to_string(&out).expect("brief written");
    assert!(md.starts_with(
        "# best project management software: Top Picks, Comparisons & FAQs\n\n> Compare the best"
    ));
    assert!(md.contains("\n## People Also Ask\n\n### What is the best project management software?\n"));
    assert!(md.contains("\n## People Also Search For\n\n### free project management software\n"));
    assert!(md.contains("\n## Conclusion\n\n### Key takeaways about best project management software\n"));
}

#[test]
fn brief_without_key_or_serp_file_fails() {
    brief_cmd()
        .args(["brief", "--keyword", "crm software", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing SerpApi key"));
}

#[test]
fn brief_rejects_out_of_range_threshold() {
    let serp = fixture("serp_pm_software.json");
    brief_cmd()
        .args([
            "brief",
            "--keyword",
            "crm",
            "--serp-file",
            serp.to_str().unwrap(),
            "--threshold",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("threshold must be in (0, 1]"));
}

#[test]
fn brief_reports_provider_error_field() {
    let tmp = tempfile::tempdir().unwrap();
    let serp = tmp.path().join("serp.json");
    std::fs::write(&serp, r#"{"error": "Invalid API key."}"#).unwrap();

    brief_cmd()
        .args(["brief", "--keyword", "crm", "--serp-file"])
        .arg(&serp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid API key."));
}

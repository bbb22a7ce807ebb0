use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn serpbrief() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("serpbrief"));
    cmd.env_remove("SERPBRIEF_ENV_FILE");
    cmd
}

#[test]
fn headings_from_html_file_are_grouped_by_level() {
    let page = fixture("page.html");
    let out = serpbrief()
        .args(["headings", "--file", page.to_str().unwrap(), "--format", "json"])
        .output()
        .expect("run headings");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("headings json");
    let got: Vec<(u64, String)> = v["headings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            (
                h["level"].as_u64().unwrap(),
                h["title"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            (1, "Main title".to_string()),
            (2, "Pricing".to_string()),
            (2, "FAQ".to_string()),
            (3, "Is there a free plan?".to_string()),
        ]
    );
}

#[test]
fn headings_from_markdown_file_text_output() {
    let page = fixture("page.md");
    serpbrief()
        .args(["headings", "--file", page.to_str().unwrap()])
        .assert()
        .success()
        .stdout("h1 Getting started\n  h2 Install\n    h3 Step one\n");
}

#[test]
fn intent_text_and_json() {
    serpbrief()
        .args([
            "intent",
            "--text",
            "best budget laptop 2024",
            "--text",
            "top 10 laptops review",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Commercial\n"))
        .stdout(predicate::str::contains("commercial=3 transactional=1"));

    let out = serpbrief()
        .args([
            "intent",
            "--text",
            "what is a heat pump",
            "--text",
            "how heat pumps work guide",
            "--format",
            "json",
        ])
        .output()
        .expect("run intent");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["label"], "Informational");
    assert_eq!(v["scores"]["informational"], 3);
}

#[test]
fn cluster_prints_representatives() {
    serpbrief()
        .args([
            "cluster",
            "--heading",
            "SEO Tips",
            "--heading",
            "seo tips!!",
            "--heading",
            "Pricing Guide",
        ])
        .assert()
        .success()
        .stdout("SEO Tips\nPricing Guide\n");
}

#[test]
fn cluster_rejects_threshold_above_one() {
    serpbrief()
        .args(["cluster", "--heading", "a", "--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("threshold must be in (0, 1]"));
}

#[test]
fn doctor_reports_presence_without_values() {
    let tmp = tempfile::tempdir().unwrap();
    let env_file = tmp.path().join("serpbrief.env");
    std::fs::write(
        &env_file,
        "# keys\nSERPAPI_API_KEY=sk-from-env-file\n\nnot a pair\n",
    )
    .unwrap();

    let out = serpbrief()
        .args(["doctor"])
        .env_remove("SERPAPI_API_KEY")
        .env_remove("SERPBRIEF_PROXY_API_KEY")
        .env_remove("SERPBRIEF_PROXY_ENDPOINT")
        .env("SERPBRIEF_ENV_FILE", &env_file)
        .output()
        .expect("run doctor");
    assert!(out.status.success());

    let s = String::from_utf8_lossy(&out.stdout);
    assert!(!s.contains("sk-from-env-file"), "doctor leaked a secret");
    let v: serde_json::Value = serde_json::from_str(&s).expect("doctor json");
    assert_eq!(v["name"], "serpbrief");
    assert_eq!(v["configured"]["serpapi"], true);
    assert_eq!(v["configured"]["proxy_api_key"], false);
    assert_eq!(v["configured"]["proxy_endpoint"], "https://r.jina.ai/");
    assert!(v["checks"].as_array().is_some_and(|c| c.len() == 2));
}

#[test]
fn env_file_fills_gaps_but_never_overrides_process_env() {
    let tmp = tempfile::tempdir().unwrap();
    let env_file = tmp.path().join("serpbrief.env");
    std::fs::write(
        &env_file,
        "SERPBRIEF_PROXY_ENDPOINT=https://from-file.example/\nSERPBRIEF_PROXY_API_KEY=\"px-file\"\n",
    )
    .unwrap();

    let out = serpbrief()
        .args(["doctor"])
        .env_remove("SERPAPI_API_KEY")
        .env_remove("SERPBRIEF_PROXY_API_KEY")
        .env("SERPBRIEF_PROXY_ENDPOINT", "https://from-process.example/")
        .env("SERPBRIEF_ENV_FILE", &env_file)
        .output()
        .expect("run doctor");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("doctor json");
    assert_eq!(v["configured"]["proxy_endpoint"], "https://from-process.example/");
    assert_eq!(v["configured"]["proxy_api_key"], true);
    assert_eq!(v["configured"]["serpapi"], false);
}

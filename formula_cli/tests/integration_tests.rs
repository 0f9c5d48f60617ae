//! Integration tests for the formulary binary.
//!
//! These tests verify end-to-end behavior including:
//! - Formula editing workflow
//! - Compliance checks and exit codes
//! - CSV export and catalog import
//! - Owner scoping

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI bound to a data directory, isolated from the user's own config
fn cli_as(dir: &Path, owner: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("formulary"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(dir.join("data"))
        .arg("--owner")
        .arg(owner);
    cmd
}

fn cli(dir: &Path) -> Command {
    cli_as(dir, "alice")
}

fn create_formula(dir: &Path, name: &str) {
    cli(dir)
        .args(["formula", "create", "--name", name])
        .assert()
        .success();
}

fn add(dir: &Path, id: &str, ingredient: &str, dose: &str, unit: &str) {
    cli(dir)
        .args([
            "formula",
            "add",
            id,
            "--ingredient",
            ingredient,
            "--dose",
            dose,
            "--unit",
            unit,
        ])
        .assert()
        .success();
}

fn check_json(dir: &Path, id: &str) -> serde_json::Value {
    let output = cli(dir).args(["check", id]).output().unwrap();
    assert!(output.status.success(), "check failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("check output is not JSON")
}

fn export_records(dir: &Path, ids: &[&str]) -> (Vec<String>, Vec<csv::StringRecord>) {
    let output = cli(dir).arg("export").args(ids).output().unwrap();
    assert!(output.status.success(), "export failed: {:?}", output);

    let mut reader = csv::Reader::from_reader(output.stdout.as_slice());
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(|h| h.to_string())
        .collect();
    let records = reader.records().map(|r| r.unwrap()).collect();
    (headers, records)
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("formulary"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Supplement formula builder and compliance checker",
        ));
}

#[test]
fn test_create_and_list_formula() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["formula", "create", "--name", "Morning Stack", "--region", "eu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created formula 1: Morning Stack"));

    cli(dir)
        .args(["formula", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Morning Stack"))
        .stdout(predicate::str::contains("EU"))
        .stdout(predicate::str::contains("APPROVED"));

    assert!(dir.join("data/formulas.json").exists());
}

#[test]
fn test_mixed_formula_is_stopped() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Mixed");
    add(dir, "1", "Vitamin C", "500", "mg");
    add(dir, "1", "Kava Extract", "300", "mg");
    add(dir, "1", "Ephedra", "50", "mg");

    let report = check_json(dir, "1");
    assert_eq!(report["status"], "STOP");
    assert_eq!(report["can_proceed"], false);
    assert_eq!(report["total_ingredients"], 3);
    assert_eq!(report["total_weight_mg"].as_f64(), Some(850.0));
    assert_eq!(report["summary"]["safe"], 1);
    assert_eq!(report["summary"]["caution"], 1);
    assert_eq!(report["summary"]["risk"], 1);

    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 2);
    assert!(issues
        .iter()
        .any(|i| i["ingredient"] == "Ephedra" && i["level"] == "STOP"));
    assert!(issues
        .iter()
        .any(|i| i["ingredient"] == "Kava Extract" && i["level"] == "WARNING"));
}

#[test]
fn test_caution_only_formula_warns() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Calm");
    add(dir, "1", "Vitamin C", "0.5", "g");
    add(dir, "1", "Kava Extract", "300", "mg");
    add(dir, "1", "Vitamin D3", "1000", "IU");

    let report = check_json(dir, "1");
    assert_eq!(report["status"], "WARNING");
    assert_eq!(report["can_proceed"], true);
    assert_eq!(report["total_ingredients"], 3);
    assert_eq!(report["total_weight_mg"].as_f64(), Some(800.0));
}

#[test]
fn test_removing_risk_ingredient_approves() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Cleanup");
    add(dir, "1", "Vitamin C", "500", "mg");
    add(dir, "1", "DMAA", "25", "mg");
    assert_eq!(check_json(dir, "1")["status"], "STOP");

    cli(dir)
        .args(["formula", "remove", "1", "2"])
        .assert()
        .success();

    let report = check_json(dir, "1");
    assert_eq!(report["status"], "APPROVED");
    assert_eq!(report["total_weight_mg"].as_f64(), Some(500.0));
    assert!(report["issues"].as_array().unwrap().is_empty());
}

#[test]
fn test_check_summary_and_strict() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Strict");
    add(dir, "1", "Ephedra", "10", "mg");

    cli(dir)
        .args(["check", "1", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"STOP\""))
        .stdout(predicate::str::contains("issues").not());

    cli(dir).args(["check", "1", "--strict"]).assert().code(2);
}

#[test]
fn test_empty_formula_check_approved() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Empty");
    let report = check_json(dir, "1");
    assert_eq!(report["status"], "APPROVED");
    assert_eq!(report["total_ingredients"], 0);
}

#[test]
fn test_duplicate_ingredient_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Twice");
    add(dir, "1", "Vitamin C", "500", "mg");

    cli(dir)
        .args([
            "formula",
            "add",
            "1",
            "--ingredient",
            "vitamin c",
            "--dose",
            "250",
            "--unit",
            "mg",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_doses_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Doses");

    for (dose, unit) in [("-5", "mg"), ("abc", "mg"), ("5", "tablets"), ("5", "ug")] {
        cli(dir)
            .args([
                "formula",
                "add",
                "1",
                "--ingredient",
                "Zinc Picolinate",
                "--dose",
                dose,
                "--unit",
                unit,
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid dose"));
    }

    assert_eq!(check_json(dir, "1")["total_ingredients"], 0);
}

#[test]
fn test_unknown_ingredient_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Unknown");
    cli(dir)
        .args([
            "formula",
            "add",
            "1",
            "--ingredient",
            "Unobtainium",
            "--dose",
            "1",
            "--unit",
            "mg",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown ingredient"));
}

#[test]
fn test_other_owner_sees_nothing() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Private");
    add(dir, "1", "Vitamin C", "500", "mg");

    let as_bob = |args: &[&str]| {
        let mut cmd = cli_as(dir, "bob");
        cmd.args(args);
        cmd
    };

    as_bob(&["check", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Formula 1 not found"));
    as_bob(&["formula", "delete", "1"]).assert().failure();
    as_bob(&["formula", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No formulas yet."));

    assert_eq!(check_json(dir, "1")["total_ingredients"], 1);
}

#[test]
fn test_update_item_and_formula() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Tweak");
    add(dir, "1", "Vitamin C", "500", "mg");

    cli(dir)
        .args(["formula", "set", "1", "1", "--dose", "1", "--unit", "g"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Item 1 is now 1g"));

    cli(dir)
        .args(["formula", "update", "1", "--name", "Tweaked", "--region", "AU"])
        .assert()
        .success();

    let report = check_json(dir, "1");
    assert_eq!(report["formula_name"], "Tweaked");
    assert_eq!(report["region"], "AU");
    assert_eq!(report["total_weight_mg"].as_f64(), Some(1000.0));
}

#[test]
fn test_export_csv() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Export");
    add(dir, "1", "Vitamin C", "500", "mg");
    add(dir, "1", "Comfrey Leaf", "2", "g");

    let (headers, records) = export_records(dir, &["1"]);
    assert_eq!(
        headers,
        vec![
            "Ingredient",
            "Category",
            "Source",
            "Dose Value",
            "Dose Unit",
            "Safety",
            "Safety Level",
            "Notes"
        ]
    );
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "Vitamin C");
    assert_eq!(&records[0][6], "SAFE");
    assert_eq!(&records[1][0], "Comfrey Leaf");
    assert_eq!(&records[1][4], "g");
    assert_eq!(&records[1][6], "CAUTION");
}

#[test]
fn test_export_follows_reorder() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Ordered");
    add(dir, "1", "Vitamin C", "500", "mg");
    add(dir, "1", "Vitamin D3", "25", "mcg");
    add(dir, "1", "Ashwagandha Root", "600", "mg");

    cli(dir)
        .args(["formula", "reorder", "1", "3", "1", "2"])
        .assert()
        .success();

    let (_, records) = export_records(dir, &["1"]);
    let names: Vec<_> = records.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(names, vec!["Ashwagandha Root", "Vitamin C", "Vitamin D3"]);

    cli(dir)
        .args(["formula", "reorder", "1", "3", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid item order"));
}

#[test]
fn test_export_multiple_formulas_to_file() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "First");
    add(dir, "1", "Vitamin C", "500", "mg");
    create_formula(dir, "Second");
    add(dir, "2", "Magnesium Glycinate", "200", "mg");
    add(dir, "2", "Zinc Picolinate", "15", "mg");

    let out = dir.join("out/all.csv");
    cli(dir)
        .args(["export", "1", "2", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 formulas"));

    let mut reader = csv::Reader::from_path(&out).unwrap();
    assert_eq!(&reader.headers().unwrap()[0], "Formula ID");
    assert_eq!(&reader.headers().unwrap()[1], "Formula");
    let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(&records[2][1], "Second");
    assert_eq!(&records[2][2], "Zinc Picolinate");
}

#[test]
fn test_export_empty_formula_refused() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Nothing");
    cli(dir)
        .args(["export", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no ingredients"));
}

#[test]
fn test_duplicate_formula() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Original");
    add(dir, "1", "Kava Extract", "300", "mg");

    cli(dir)
        .args(["formula", "duplicate", "1", "--name", "Copy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicated formula 1 as 2: Copy"));

    let report = check_json(dir, "2");
    assert_eq!(report["formula_name"], "Copy");
    assert_eq!(report["status"], "WARNING");

    cli(dir)
        .args(["formula", "delete", "1"])
        .assert()
        .success();
    assert_eq!(check_json(dir, "2")["total_ingredients"], 1);
}

#[test]
fn test_builtin_catalog_queries() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let output = cli(dir).args(["ingredients", "stats"]).output().unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total"], 10);
    assert_eq!(stats["by_safety_level"]["risk"], 2);

    cli(dir)
        .args(["ingredients", "list", "--exclude-risk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vitamin C"))
        .stdout(predicate::str::contains("Ephedra").not());

    cli(dir)
        .args(["ingredients", "categories"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stimulants"));

    cli(dir)
        .args(["ingredients", "show", "ephedra"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"safety_level\": \"RISK\""))
        .stdout(predicate::str::contains("#f44336"));
}

#[test]
fn test_import_catalog() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let csv_path = dir.join("ingredients.csv");
    fs::write(
        &csv_path,
        "Ingredient,Category,Source,Safety,Evidence\n\
         Turmeric,Herbs,Root,General dietary use,Curcumin\n\
         Yohimbe,Herbs,Bark,Prohibited in several regions,\n\
         ,Herbs,Leaf,General dietary use,\n",
    )
    .unwrap();

    cli(dir)
        .args(["ingredients", "import"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 created, 0 updated, 1 skipped"));

    cli(dir)
        .args(["ingredients", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Turmeric"))
        .stdout(predicate::str::contains("Vitamin C"));

    create_formula(dir, "Imported");
    add(dir, "1", "Yohimbe", "5", "mg");
    assert_eq!(check_json(dir, "1")["status"], "STOP");
}

#[test]
fn test_import_keeps_existing_formulas_intact() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    create_formula(dir, "Before Import");
    add(dir, "1", "DMAA", "50", "mg");
    add(dir, "1", "Vitamin C", "500", "mg");
    assert_eq!(check_json(dir, "1")["status"], "STOP");
    let (_, before) = export_records(dir, &["1"]);

    let mut csv = String::from("Ingredient,Category,Source,Safety,Evidence\n");
    for i in 0..12 {
        csv.push_str(&format!("Imported {},Herbs,Plant,General dietary use,\n", i));
    }
    let csv_path = dir.join("bulk.csv");
    fs::write(&csv_path, csv).unwrap();

    cli(dir)
        .args(["ingredients", "import"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("12 created, 0 updated, 0 skipped"));

    let report = check_json(dir, "1");
    assert_eq!(report["status"], "STOP");
    assert_eq!(report["summary"]["risk"], 1);
    assert_eq!(report["issues"][0]["ingredient"], "DMAA");

    let (_, after) = export_records(dir, &["1"]);
    let names = |records: &[csv::StringRecord]| -> Vec<String> {
        records.iter().map(|r| r[0].to_string()).collect()
    };
    assert_eq!(names(&after), names(&before));
    assert_eq!(names(&after), vec!["DMAA", "Vitamin C"]);
}

#[test]
fn test_custom_classifier_rules() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let config_path = dir.join("custom.toml");
    fs::write(
        &config_path,
        r#"
[[classifier.rules]]
level = "RISK"
keywords = ["banned"]

[[classifier.rules]]
level = "CAUTION"
keywords = ["dietary"]
"#,
    )
    .unwrap();

    create_formula(dir, "Custom");
    add(dir, "1", "Vitamin C", "500", "mg");

    let output = cli(dir)
        .arg("--config")
        .arg(&config_path)
        .args(["check", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "WARNING");
}

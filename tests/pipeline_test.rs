//! Job pipeline integration tests.
//!
//! Tests:
//! - fresh run provisions, applies parameters and executes the main script
//! - a failing statement is recorded and the job resumes at it
//! - ambiguous scripts abort before the database is created
//! - diagnostics snapshots are written past the threshold
//! - CSV reference data is loaded and result tables are exported

mod common;

use common::JobFixture;
use sqlstep::job::{JobDescriptor, JobStatus, ResumePolicy};
use sqlstep::pipeline::{Pipeline, ResumeRequest, RunOptions};
use sqlstep::Error;

const MAIN: &str = "\
-- build the grid
CREATE TABLE bus_data (id INTEGER PRIMARY KEY, voltage INT, note TEXT);
INSERT INTO bus_data (voltage, note) VALUES (110000, 'north; main');
INSERT INTO bus_data (voltage, note) VALUES (220000, 'south -- spare');
UPDATE bus_data SET voltage = (SELECT val_int FROM abstr_values WHERE val_description = 'min_voltage') WHERE id = 1;
";

fn resume(request: ResumeRequest) -> RunOptions {
    RunOptions {
        resume: request,
        policy: ResumePolicy::RetryFailed,
    }
}

#[test]
fn test_fresh_run_completes() {
    let fixture = JobFixture::new(MAIN);
    let paths = fixture.paths();
    let config = fixture.config();

    let report = Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap();

    assert_eq!(report.summary.executed, 4);
    assert_eq!(report.summary.skipped, 0);
    assert_eq!(report.job.status, JobStatus::Completed);
    assert_eq!(report.job.high_water_mark, 4);

    assert_eq!(fixture.query_i64("SELECT count(*) FROM bus_data"), 2);
    assert_eq!(fixture.query_i64("SELECT voltage FROM bus_data WHERE id = 1"), 110000);
    assert_eq!(fixture.query_i64("SELECT count(*) FROM bus_data WHERE note = 'south -- spare'"), 1);
    assert_eq!(fixture.query_i64("SELECT status FROM _db_status WHERE module = 'grid'"), 1);

    let saved = JobDescriptor::load(&paths.job_file()).unwrap().unwrap();
    assert_eq!(saved.status, JobStatus::Completed);
}

#[test]
fn test_failure_then_resume_from_job() {
    let broken = MAIN.replace("INSERT INTO bus_data (voltage, note) VALUES (220000", "INSERT INTO bus_data (voltage, nope) VALUES (220000");
    let fixture = JobFixture::new(&broken);
    let paths = fixture.paths();
    let config = fixture.config();

    let err = Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap_err();
    match &err {
        Error::StatementFailed { index, statement, detail } => {
            assert_eq!(*index, 2);
            assert!(statement.contains("nope"));
            assert!(detail.contains("nope"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let saved = JobDescriptor::load(&paths.job_file()).unwrap().unwrap();
    assert_eq!(saved.status, JobStatus::Failed);
    assert_eq!(saved.high_water_mark, 2);
    assert_eq!(fixture.query_i64("SELECT count(*) FROM bus_data"), 1);

    // Operator fixes the statement and resumes where it failed.
    fixture.write_script("main.sql", MAIN);
    let report = Pipeline::new(&paths, &config)
        .run(&resume(ResumeRequest::FromJob), None)
        .unwrap();

    assert_eq!(report.checkpoint.resume_from(), 2);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(report.summary.executed, 2);
    // Statement 1 was not replayed.
    assert_eq!(fixture.query_i64("SELECT count(*) FROM bus_data"), 2);
    assert_eq!(report.job.status, JobStatus::Completed);
}

#[test]
fn test_resume_at_explicit_index() {
    let fixture = JobFixture::new(MAIN);
    let paths = fixture.paths();
    let config = fixture.config();
    Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap();

    // Re-run only the last statement against the existing database.
    let report = Pipeline::new(&paths, &config)
        .run(&resume(ResumeRequest::At(3)), None)
        .unwrap();
    assert_eq!(report.summary.executed, 1);
    assert_eq!(fixture.query_i64("SELECT count(*) FROM bus_data"), 2);
}

#[test]
fn test_resume_past_end_is_rejected() {
    let fixture = JobFixture::new(MAIN);
    let paths = fixture.paths();
    let config = fixture.config();

    let err = Pipeline::new(&paths, &config)
        .run(&resume(ResumeRequest::At(9)), None)
        .unwrap_err();
    assert!(matches!(err, Error::ResumeOutOfRange { resume_from: 9, total: 4 }));
}

#[test]
fn test_resume_without_database_is_connectivity_error() {
    let fixture = JobFixture::new(MAIN);
    let paths = fixture.paths();
    let config = fixture.config();

    let err = Pipeline::new(&paths, &config)
        .run(&resume(ResumeRequest::At(0)), None)
        .unwrap_err();
    assert!(matches!(err, Error::Connectivity { index: None, .. }));

    let saved = JobDescriptor::load(&paths.job_file()).unwrap().unwrap();
    assert_eq!(saved.status, JobStatus::Failed);
}

#[test]
fn test_resume_from_job_without_descriptor() {
    let fixture = JobFixture::new(MAIN);
    let paths = fixture.paths();
    let config = fixture.config();

    let err = Pipeline::new(&paths, &config)
        .run(&resume(ResumeRequest::FromJob), None)
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_ambiguous_script_touches_nothing() {
    let fixture = JobFixture::new("CREATE TABLE t(x text);\nINSERT INTO t VALUES ('unterminated);\n");
    let paths = fixture.paths();
    let config = fixture.config();

    let err = Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap_err();
    assert!(matches!(err, Error::ParseAmbiguity { line: 2, .. }));
    assert!(!fixture.database().exists());
}

#[test]
fn test_diagnostics_snapshots() {
    let fixture = JobFixture::new(MAIN);
    fixture.append_config(
        r#"
[diagnostics]
after_index = 1
table = "debug"
columns = "step_before INTEGER, num_bus INTEGER"
sql = "INSERT INTO debug VALUES ({index}, (SELECT count(*) FROM bus_data))"
"#,
    );
    let paths = fixture.paths();
    let config = fixture.config();

    Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap();

    assert_eq!(fixture.query_i64("SELECT count(*) FROM debug"), 2);
    assert_eq!(fixture.query_i64("SELECT num_bus FROM debug WHERE step_before = 2"), 2);
}

#[test]
fn test_finalize_failure_does_not_replay_statements() {
    let fixture = JobFixture::new(MAIN);
    fixture.write_config(
        &std::fs::read_to_string(&fixture.config_path)
            .unwrap()
            .replace("main = \"sql/main.sql\"", "main = \"sql/main.sql\"\nfinalize = [\"SELECT * FROM results_missing\"]"),
    );
    let paths = fixture.paths();
    let config = fixture.config();

    let err = Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap_err();
    assert!(matches!(err, Error::Database(_)));

    let saved = JobDescriptor::load(&paths.job_file()).unwrap().unwrap();
    assert_eq!(saved.status, JobStatus::Failed);
    assert_eq!(saved.high_water_mark, 4);
    assert_eq!(saved.resume_checkpoint(ResumePolicy::RetryFailed).unwrap().resume_from(), 4);
}

#[test]
fn test_csv_load_and_export() {
    let fixture = JobFixture::new(MAIN);
    fixture.write_script(
        "schema.sql",
        "CREATE TABLE abstr_values (val_description TEXT, val_int INT);\n\
         INSERT INTO abstr_values VALUES ('min_voltage', 0);\n\
         CREATE TABLE transfer_busses (osm_id TEXT, center_geom TEXT);\n",
    );
    std::fs::create_dir_all(fixture.root().join("data")).unwrap();
    std::fs::write(
        fixture.root().join("data").join("busses.csv"),
        "geom,osm\nPOINT(1 2),w17\nPOINT(3 4),n5\n",
    )
    .unwrap();
    fixture.append_config(
        r#"
[[csv_loads]]
file = "data/busses.csv"
table = "transfer_busses"
columns = ["osm_id", "center_geom"]
fields = [1, 0]

[export]
tables = ["bus_data"]
"#,
    );
    let paths = fixture.paths();
    let config = fixture.config();

    let report = Pipeline::new(&paths, &config).run(&RunOptions::default(), None).unwrap();

    assert_eq!(fixture.query_i64("SELECT count(*) FROM transfer_busses"), 2);
    assert_eq!(fixture.query_i64("SELECT count(*) FROM transfer_busses WHERE osm_id = 'w17'"), 1);

    let expected = paths.job_dir.join("results").join("bus_data.csv");
    assert_eq!(report.exported, vec![expected.clone()]);
    assert_eq!(
        std::fs::read_to_string(expected).unwrap(),
        "id,voltage,note\n1,110000,north; main\n2,220000,south -- spare\n"
    );
}

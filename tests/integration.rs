use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

fn docqa_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docqa");
    path
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Offline setup: hashing embedder, SQLite index in the temp dir, no LLM.
fn setup_test_env_with_port(port: u16) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "# Alpha Document\nThis is the alpha document about Rust programming.\nIt contains information about cargo and crates.\nCargo builds crates and resolves dependencies.",
    )
    .unwrap();
    fs::write(
        files_dir.join("beta.txt"),
        "Beta document.\nThis document discusses Python and machine learning.\nDeep learning frameworks like PyTorch are covered.",
    )
    .unwrap();
    fs::write(files_dir.join("empty.txt"), "  \n\n  \n").unwrap();
    fs::write(files_dir.join("broken.pdf"), b"this is not really a pdf").unwrap();

    let config_content = format!(
        r#"[chunking]
separator = "\n"
chunk_size = 120
overlap = 30

[retrieval]
k = 3
candidate_k = 12

[embedding]
provider = "hashing"
dims = 256

[index]
backend = "sqlite"
path = "{}/data/docqa.sqlite"
collection = "integration"

[llm]
provider = "disabled"

[server]
bind = "127.0.0.1:{}"
"#,
        root.display(),
        port
    );

    let config_path = config_dir.join("docqa.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn setup_test_env() -> (TempDir, PathBuf) {
    setup_test_env_with_port(find_free_port())
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn run_docqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docqa_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docqa binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn ingest_file(config_path: &Path, name: &str) -> (String, String, bool) {
    let path = files_dir(config_path).join(name);
    run_docqa(config_path, &["ingest", path.to_str().unwrap()])
}

fn evidence_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('['))
        .map(str::to_string)
        .collect()
}

#[test]
fn test_init_creates_index() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Index initialized"));

    let db_path = config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("data/docqa.sqlite");
    assert!(db_path.exists());
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(success, "first init failed: {}", stderr);
    let (_, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_ingest_reports_chunks() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);

    let (stdout, stderr, success) = ingest_file(&config_path, "alpha.md");
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("Ingested"), "unexpected output: {}", stdout);
    assert!(stdout.contains("alpha.md"));
    assert!(stdout.contains("as document"));
}

#[test]
fn test_search_shows_ranked_evidence() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);
    ingest_file(&config_path, "alpha.md");
    ingest_file(&config_path, "beta.txt");

    let (stdout, stderr, success) =
        run_docqa(&config_path, &["search", "cargo builds crates"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("FIRST DOCUMENTS BY RELEVANCE:"));

    let lines = evidence_lines(&stdout);
    assert!(!lines.is_empty(), "expected evidence lines: {}", stdout);
    assert!(lines.len() <= 3);
    assert!(
        lines[0].contains("Cargo builds crates") || lines[0].contains("cargo and crates"),
        "alpha chunk should rank first, got: {}",
        stdout
    );
}

#[test]
fn test_reingest_does_not_duplicate_evidence() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);
    ingest_file(&config_path, "alpha.md");
    let (_, stderr, success) = ingest_file(&config_path, "alpha.md");
    assert!(success, "second ingest failed: {}", stderr);

    let (stdout, _, success) =
        run_docqa(&config_path, &["search", "rust cargo crates", "--k", "3"]);
    assert!(success);

    let lines = evidence_lines(&stdout);
    let unique: HashSet<_> = lines.iter().collect();
    assert_eq!(lines.len(), unique.len(), "duplicate evidence: {}", stdout);
}

#[test]
fn test_ask_without_llm_still_prints_evidence() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);
    ingest_file(&config_path, "alpha.md");

    let (stdout, stderr, success) =
        run_docqa(&config_path, &["ask", "What does cargo build?"]);
    assert!(!success, "ask should fail with the LLM disabled");
    assert!(stdout.contains("QUESTION: \"What does cargo build?\""));
    assert!(stdout.contains("ANSWER: (unavailable)"));
    assert!(stdout.contains("FIRST DOCUMENTS BY RELEVANCE:"));
    assert!(!evidence_lines(&stdout).is_empty());
    assert!(stderr.contains("synthesis failed"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_empty_document_indexes_nothing() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);

    let (stdout, stderr, success) = ingest_file(&config_path, "empty.txt");
    assert!(success, "empty ingest should not fail: {}", stderr);
    assert!(stdout.contains("No extractable text"));

    let (stdout, _, success) = run_docqa(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Chunks:      0"), "stats: {}", stdout);
}

#[test]
fn test_ingest_invalid_pdf_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);

    let (_, stderr, success) = ingest_file(&config_path, "broken.pdf");
    assert!(!success);
    assert!(stderr.contains("extraction failed"), "stderr: {}", stderr);
}

#[test]
fn test_stats_counts_documents() {
    let (_tmp, config_path) = setup_test_env();
    run_docqa(&config_path, &["init"]);
    ingest_file(&config_path, "alpha.md");
    ingest_file(&config_path, "beta.txt");

    let (stdout, stderr, success) = run_docqa(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Collection:  integration"));
    assert!(stdout.contains("Documents:   2"), "stats: {}", stdout);
    assert!(stdout.contains("hashing"));
}

#[test]
fn test_invalid_chunking_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path)
        .unwrap()
        .replace("overlap = 30", "overlap = 120");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunking.overlap"), "stderr: {}", stderr);
}

struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn wait_for_server(client: &reqwest::blocking::Client, port: u16) {
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..100 {
        std::thread::sleep(Duration::from_millis(100));
        if let Ok(resp) = client.get(&url).send() {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 10 seconds");
}

#[test]
fn test_http_ingest_search_and_ask() {
    let port = find_free_port();
    let (_tmp, config_path) = setup_test_env_with_port(port);
    run_docqa(&config_path, &["init"]);

    let child = Command::new(docqa_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let _guard = ServerGuard(child);

    let client = reqwest::blocking::Client::new();
    wait_for_server(&client, port);
    let base = format!("http://127.0.0.1:{}", port);

    let resp = client
        .post(format!("{}/ingest?source=handbook.txt", base))
        .header("content-type", "text/plain")
        .body("Expense reports are due on the fifth business day.\nLate reports need manager approval.")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().unwrap();
    assert!(body["chunks"].as_u64().unwrap() >= 1);
    assert!(body["document_id"].as_str().is_some());

    let resp = client
        .post(format!("{}/ingest", base))
        .header("content-type", "text/plain")
        .body("   ")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "document_empty");

    let resp = client
        .post(format!("{}/search", base))
        .json(&json!({"query": "when are expense reports due", "k": 2}))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().unwrap();
    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty() && results.len() <= 2);
    assert!(results[0]["score"].as_f64().is_some());

    let resp = client
        .post(format!("{}/search", base))
        .json(&json!({"query": "   "}))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "empty_query");

    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({"question": "when are expense reports due?"}))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "synthesis_failure");
    assert!(!body["evidence"].as_array().unwrap().is_empty());
}

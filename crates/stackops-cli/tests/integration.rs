use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stackops(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stackops").unwrap();
    cmd.current_dir(dir.path()).env("STACKOPS_ROOT", dir.path());
    cmd
}

/// Lay out a minimal installation: compose file, service dirs, env files.
fn seed_install(dir: &TempDir) {
    std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    for service in [
        "caddy",
        "mongodb",
        "stackend",
        "stackrepl",
        "stackweb",
        "supabase",
        "unstructured",
        "weaviate",
    ] {
        std::fs::create_dir_all(dir.path().join(service)).unwrap();
    }
    std::fs::create_dir_all(dir.path().join("scripts/docker")).unwrap();
    std::fs::create_dir_all(dir.path().join("supabase/volumes/api")).unwrap();
    std::fs::write(
        dir.path().join("supabase/volumes/api/kong.yml"),
        "services:\n  ## Secure Auth routes\n  - name: auth-v1\n",
    )
    .unwrap();
}

// ---------------------------------------------------------------------------
// stackops env
// ---------------------------------------------------------------------------

#[test]
fn env_init_creates_every_service_env() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    stackops(&dir)
        .args(["env", "init", "--host", "10.0.0.5", "--licence", "lic-123"])
        .assert()
        .success();

    for service in ["stackend", "stackweb", "supabase", "mongodb", "weaviate"] {
        assert!(dir.path().join(service).join(".env").is_file());
    }
    let stackend = std::fs::read_to_string(dir.path().join("stackend/.env")).unwrap();
    assert!(stackend.contains("STACKAI_LICENCE=lic-123"));
}

#[test]
fn env_set_then_get_round_trips() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    std::fs::write(dir.path().join("stackend/.env"), "EXISTING=1\n").unwrap();

    stackops(&dir)
        .args(["env", "set", "stackend", "NEW_KEY", "new-value"])
        .assert()
        .success();

    stackops(&dir)
        .args(["env", "get", "stackend", "NEW_KEY"])
        .assert()
        .success()
        .stdout(predicate::str::contains("new-value"));

    // Untouched lines survive.
    let content = std::fs::read_to_string(dir.path().join("stackend/.env")).unwrap();
    assert!(content.contains("EXISTING=1"));
}

#[test]
fn env_get_missing_key_fails_with_error() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    std::fs::write(dir.path().join("stackend/.env"), "A=1\n").unwrap();

    stackops(&dir)
        .args(["env", "get", "stackend", "MISSING"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn env_set_fails_on_missing_env_file() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);

    stackops(&dir)
        .args(["env", "set", "stackend", "KEY", "value"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("env file not found"));
}

#[test]
fn env_urls_rewrites_fanout_keys() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    std::fs::write(
        dir.path().join("stackend/.env"),
        "STACKWEB_URL=http://old\nSTACKEND_API_URL=http://old\nINDEXING_API_URL=http://old\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("stackweb/.env"),
        "NEXT_PUBLIC_URL=http://old\nNEXT_PUBLIC_SITE_URL=http://old\nNEXT_PUBLIC_INDEX_URL=http://old\nNEXT_PUBLIC_CHAT_BACKEND_URL=http://old\nNEXT_PUBLIC_STACKEND_URL=http://old\nNEXT_PUBLIC_STACKEND_INFERENCE_URL=http://old\nNEXT_PUBLIC_SUPABASE_URL=http://old\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("supabase/.env"),
        "SITE_URL=http://old\nAPI_EXTERNAL_URL=http://old\nSUPABASE_PUBLIC_URL=http://old\n",
    )
    .unwrap();

    stackops(&dir)
        .args([
            "env",
            "urls",
            "--app-url",
            "https://app.example.com",
            "--api-url",
            "https://api.example.com",
            "--supabase-url",
            "https://supabase.example.com",
            "--yes",
        ])
        .assert()
        .success();

    let stackend = std::fs::read_to_string(dir.path().join("stackend/.env")).unwrap();
    assert!(stackend.contains("STACKWEB_URL=https://app.example.com"));
    assert!(stackend.contains("STACKEND_API_URL=https://api.example.com"));

    stackops(&dir)
        .args(["env", "urls", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://app.example.com"));
}

// ---------------------------------------------------------------------------
// stackops saml
// ---------------------------------------------------------------------------

#[test]
fn saml_status_reads_supabase_env() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    std::fs::write(
        dir.path().join("supabase/.env"),
        "API_EXTERNAL_URL=https://stackai.example.com:8443\nSAML_ENABLED=true\n",
    )
    .unwrap();

    stackops(&dir)
        .args(["saml", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("true"))
        .stdout(predicate::str::contains(
            "https://stackai.example.com:8443/auth/v1/sso/saml/acs",
        ));
}

#[test]
fn saml_delete_rejects_malformed_id_before_any_network_io() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);

    stackops(&dir)
        .args(["saml", "delete", "not-a-uuid", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a UUID"));
}

#[test]
fn saml_add_rejects_empty_domain_list() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);

    stackops(&dir)
        .args(["saml", "add", "https://idp.example.com/metadata", "--domains", " , "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no valid domains"));
}

// ---------------------------------------------------------------------------
// stackops versions
// ---------------------------------------------------------------------------

fn seed_versions(dir: &TempDir) {
    std::fs::write(
        dir.path().join("scripts/docker/stackai-versions.json"),
        r#"[{ "v2.0.0": { "stackend": "2.0.0", "stackweb": "2.0.0", "stackrepl": "1.0.0" } }]"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("stackend/docker-compose.yml"),
        "services:\n  backend:\n    image: stackai.azurecr.io/stackai/stackend-backend:1.0.0\n  worker:\n    image: stackai.azurecr.io/stackai/stackend-celery-worker:1.0.0\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("stackweb/Dockerfile"),
        "FROM stackai.azurecr.io/stackai/stackweb:1.0.0\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("stackrepl/docker-compose.yml"),
        "services:\n  repl:\n    image: stackai.azurecr.io/stackai/stackrepl/stack-repl:0.5.0\n",
    )
    .unwrap();
}

#[test]
fn versions_list_shows_releases() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    seed_versions(&dir);

    stackops(&dir)
        .args(["versions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v2.0.0"));
}

#[test]
fn versions_bump_rewrites_image_tags() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    seed_versions(&dir);

    stackops(&dir)
        .args(["versions", "bump", "v2.0.0"])
        .assert()
        .success();

    let dockerfile = std::fs::read_to_string(dir.path().join("stackweb/Dockerfile")).unwrap();
    assert_eq!(
        dockerfile,
        "FROM stackai.azurecr.io/stackai/stackweb:2.0.0\n"
    );
}

#[test]
fn versions_bump_rejects_unknown_release() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    seed_versions(&dir);

    stackops(&dir)
        .args(["versions", "bump", "v9.9.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("v2.0.0"));
}

// ---------------------------------------------------------------------------
// stackops update
// ---------------------------------------------------------------------------

#[test]
fn update_run_sync_only_from_local_zip() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    std::fs::write(dir.path().join("stackend/.env"), "KEPT=yes\n").unwrap();

    // Build a release zip with a single content root.
    let staging = TempDir::new().unwrap();
    let zip_path = staging.path().join("release.zip");
    let file = std::fs::File::create(&zip_path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    zip.add_directory("stackai-onprem-main/", options).unwrap();
    zip.start_file("stackai-onprem-main/docker-compose.yml", options)
        .unwrap();
    std::io::Write::write_all(&mut zip, b"services: {}\n").unwrap();
    zip.add_directory("stackai-onprem-main/stackend/", options)
        .unwrap();
    zip.start_file("stackai-onprem-main/stackend/.env", options)
        .unwrap();
    std::io::Write::write_all(&mut zip, b"NEW=overwrite-attempt\n").unwrap();
    zip.start_file("stackai-onprem-main/stackend/main.py", options)
        .unwrap();
    std::io::Write::write_all(&mut zip, b"print()\n").unwrap();
    zip.finish().unwrap();

    stackops(&dir)
        .args(["update", "run", "--sync-only", "--yes"])
        .arg("--zip")
        .arg(&zip_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("copied"));

    // Operator's .env preserved, new file landed.
    let env = std::fs::read_to_string(dir.path().join("stackend/.env")).unwrap();
    assert_eq!(env, "KEPT=yes\n");
    assert!(dir.path().join("stackend/main.py").is_file());
}

#[test]
fn update_llm_config_migrates_model_entries() {
    let dir = TempDir::new().unwrap();
    seed_install(&dir);
    std::fs::write(
        dir.path().join("stackend/llm_local_config.toml"),
        "[llms.providers.Local.default]\nmodel_name = \"llama3\"\n\n[llms.providers.Local.llama3]\nname = \"llama3\"\n",
    )
    .unwrap();

    stackops(&dir)
        .args(["update", "llm-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("migrated"));

    let content =
        std::fs::read_to_string(dir.path().join("stackend/llm_local_config.toml")).unwrap();
    assert!(content.contains("model_id"));
    assert!(content.contains("has_function_calling"));
}

// ---------------------------------------------------------------------------
// stackops infra
// ---------------------------------------------------------------------------

#[test]
fn infra_synth_renders_yaml_blueprint() {
    let dir = TempDir::new().unwrap();

    stackops(&dir)
        .args([
            "infra",
            "synth",
            "--region",
            "us-east-1",
            "--account",
            "123456789012",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("stackai-production-eks"))
        .stdout(predicate::str::contains("aurora"));
}

#[test]
fn infra_outputs_include_kubeconfig_command() {
    let dir = TempDir::new().unwrap();

    stackops(&dir)
        .args([
            "infra",
            "outputs",
            "--region",
            "eu-west-1",
            "--account",
            "123456789012",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("aws eks update-kubeconfig"))
        .stdout(predicate::str::contains("eu-west-1"));
}

#[test]
fn infra_rejects_invalid_account() {
    let dir = TempDir::new().unwrap();

    stackops(&dir)
        .args(["infra", "synth", "--region", "us-east-1", "--account", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("12-digit"));
}

// ---------------------------------------------------------------------------
// root resolution
// ---------------------------------------------------------------------------

#[test]
fn commands_refuse_a_directory_that_is_not_an_install() {
    let dir = TempDir::new().unwrap();

    stackops(&dir)
        .args(["versions", "bump", "v1.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a StackAI installation root"));
}

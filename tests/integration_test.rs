//! End-to-end runs against a mock AISR (identity provider, API and signed storage)

use std::path::Path;

use mn_immunization::config::Config;
use mn_immunization::models::Credentials;
use mn_immunization::orchestrator::App;
use wiremock::matchers::{body_string_contains, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const AUTH_PREFIX: &str = "/mock-auth-server/auth/realms/idepc-aisr-realm";

const LOGIN_PAGE: &str = r#"<html><body>
<form id="kc-form-login" method="post"
      action="/protocol/openid-connect/login?session_code=mock-session-code&amp;tab_id=mock-tab-id">
</form></body></html>"#;

fn aisr_export(school_id: &str) -> String {
    format!(
        "id_1|id_2|name|dob|vaccine_group_name|vaccination_date\n\
         {id}1|456|John Doe|2010-01-01|MMR|05/01/2023\n\
         {id}2|101|Jane Smith|2011-02-02|Polio|2022-03-07\n",
        id = school_id
    )
}

/// Mounts the provider; `logouts` is the exact number of logout calls expected
async fn mount_identity_provider(server: &MockServer, logouts: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/protocol/openid-connect/auth", AUTH_PREFIX)))
        .and(query_param("client_id", "aisr-app"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/login-actions/authenticate", AUTH_PREFIX)))
        .and(query_param("session_code", "mock-session-code"))
        .and(query_param("tab_id", "mock-tab-id"))
        .and(body_string_contains("password=test_password&username=test_user"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Set-Cookie", "KEYCLOAK_IDENTITY=mocked-identity; Path=/")
                .insert_header("Location", format!("{}/home#code=test_code", server.uri())),
        )
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/login-actions/authenticate", AUTH_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/protocol/openid-connect/token", AUTH_PREFIX)))
        .and(body_string_contains("code=test_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mocked-access-token",
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/protocol/openid-connect/logout", AUTH_PREFIX)))
        .and(query_param("client_id", "aisr-app"))
        .respond_with(ResponseTemplate::new(200))
        .expect(logouts)
        .mount(server)
        .await;
}

async fn mount_upload_api(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/signing/puturl"))
        .and(header("Authorization", "Bearer mocked-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": format!("{}/test-s3-put-location", server.uri())
        })))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/test-s3-put-location"))
        .and(|req: &Request| req.body.is_empty())
        .respond_with(ResponseTemplate::new(400).set_body_string("Empty request body."))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/test-s3-put-location"))
        .and(header("x-amz-meta-iddis", "0197"))
        .and(header("content-type", "text/csv"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_download_api(server: &MockServer, school_ids: &[&str]) {
    for id in school_ids {
        Mock::given(method("GET"))
            .and(path(format!("/school/query/{}", id)))
            .and(header("Authorization", "Bearer mocked-access-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 16386,
                "schoolId": id,
                "uploadDateTime": 1740764967763i64,
                "fullVaccineFileUrl": format!("{}/test-s3-get-location/{}", server.uri(), id),
                "fullVaccineFileName": format!("full/school_{}.full.txt", id)
            }])))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/test-s3-get-location/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(aisr_export(id)))
            .mount(server)
            .await;
    }
}

fn config_for(server: &MockServer, root: &Path, schools: serde_json::Value) -> Config {
    let json = serde_json::json!({
        "paths": {
            "input_folder": root.join("input"),
            "output_folder": root.join("output"),
        },
        "api": {
            "auth_base_url": format!("{}/mock-auth-server", server.uri()),
            "aisr_api_base_url": server.uri(),
            "request_timeout_secs": 10
        },
        "schools": schools,
    });
    Config::from_json_str(&json.to_string()).unwrap()
}

#[tokio::test]
async fn bulk_query_uploads_each_school_and_isolates_failures() {
    let server = MockServer::start().await;
    mount_identity_provider(&server, 1).await;
    mount_upload_api(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let full = dir.path().join("friendly_hills.csv");
    let empty = dir.path().join("empty.csv");
    let other = dir.path().join("garlough.csv");
    std::fs::write(&full, "id_1,id_2,first_name\n1,2,Ada\n").unwrap();
    std::fs::write(&empty, "").unwrap();
    std::fs::write(&other, "id_1,id_2,first_name\n3,4,Grace\n").unwrap();

    let config = config_for(
        &server,
        dir.path(),
        serde_json::json!([
            {"name": "Friendly Hills", "id": "2542", "classification": "N",
             "email": "a@example.com", "bulk_query_file": full},
            {"name": "Empty School", "id": "9999", "classification": "N",
             "email": "b@example.com", "bulk_query_file": empty},
            {"name": "Garlough", "id": "2543", "classification": "N",
             "email": "c@example.com", "bulk_query_file": other}
        ]),
    );

    let report = App::new(config)
        .handle_bulk_query(Credentials::new("test_user", "test_password"))
        .await
        .unwrap();

    let order: Vec<&str> = report.records.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(order, vec!["2542", "9999", "2543"]);
    assert_eq!(report.succeeded(), 2);
    let failed: Vec<&str> = report.failures().map(|(r, _)| r.target.as_str()).collect();
    assert_eq!(failed, vec!["9999"]);

    let requests = server.received_requests().await.unwrap();
    let uploaded: Vec<Vec<u8>> = requests
        .iter()
        .filter(|r| r.method.as_str() == "PUT" && !r.body.is_empty())
        .map(|r| r.body.clone())
        .collect();
    assert_eq!(
        uploaded,
        vec![std::fs::read(&full).unwrap(), std::fs::read(&other).unwrap()]
    );
}

#[tokio::test]
async fn wrong_password_runs_no_actions_and_still_logs_out() {
    let server = MockServer::start().await;
    mount_identity_provider(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/signing/puturl"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let query = dir.path().join("query.csv");
    std::fs::write(&query, "id_1\n1\n").unwrap();
    let config = config_for(
        &server,
        dir.path(),
        serde_json::json!([{"name": "Friendly Hills", "id": "2542", "classification": "N",
                            "email": "a@example.com", "bulk_query_file": query}]),
    );

    let err = App::new(config)
        .handle_bulk_query(Credentials::new("test_user", "wrong_password"))
        .await
        .unwrap_err();

    assert!(err.is_authentication_failure());
}

#[tokio::test]
async fn downloaded_files_flow_through_the_transform() {
    let server = MockServer::start().await;
    mount_identity_provider(&server, 1).await;
    mount_download_api(&server, &["2542", "2543"]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/school/query/7777$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(
        &server,
        dir.path(),
        serde_json::json!([
            {"name": "Friendly Hills", "id": "2542", "classification": "N", "email": "a@example.com"},
            {"name": "No Results", "id": "7777", "classification": "N", "email": "b@example.com"},
            {"name": "Garlough Elementary", "id": "2543", "classification": "N", "email": "c@example.com"}
        ]),
    );
    let app = App::new(config);

    let report = app
        .handle_get_vaccinations(Credentials::new("test_user", "test_password"))
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let input = dir.path().join("input");
    assert!(input.join("Friendly_Hills_vaccinations.csv").exists());
    assert!(input.join("Garlough_Elementary_vaccinations.csv").exists());
    assert!(!input.join("No_Results_vaccinations.csv").exists());

    let summary = app.handle_transform(true).unwrap();
    assert_eq!(summary.processed.len(), 2);
    assert!(summary.failed.is_empty());

    let output = dir.path().join("output");
    let transformed =
        std::fs::read_to_string(output.join("Friendly_Hills_vaccinations.csv")).unwrap();
    assert_eq!(transformed, "25421,456,MMR,05/01/2023\n25422,101,Polio,03/07/2022\n");

    assert_eq!(
        std::fs::read_dir(output.join("metadata")).unwrap().count(),
        2
    );
    let master = std::fs::read_to_string(output.join("all_known_vaccinations.csv")).unwrap();
    assert_eq!(master.lines().count(), 4);
    let changes: Vec<_> = std::fs::read_dir(output.join("changes")).unwrap().collect();
    assert_eq!(changes.len(), 1);
}

use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use fxform::core::{ConversionForm, Currency, FetchOutcome, RateProvider, ScreenState};
use fxform::providers::ExchangeRateApiProvider;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const BRL_RATES: &str = r#"{
        "provider": "https://www.exchangerate-api.com",
        "base": "BRL",
        "date": "2024-05-02",
        "time_last_updated": 1714608001,
        "rates": {"BRL": 1, "USD": 0.2, "EUR": 0.18, "GBP": 0.16, "JPY": 30.1}
    }"#;

    pub async fn create_mock_server(base: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v4/latest/{base}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_rates_server() -> MockServer {
        create_mock_server(
            "BRL",
            ResponseTemplate::new(200).set_body_string(BRL_RATES),
        )
        .await
    }

    pub fn write_config(file: &tempfile::NamedTempFile, base_url: &str) {
        let config_content = format!(
            r#"
            base_currency: "BRL"
            currencies:
              - code: "BRL"
                name: "Real (BRL)"
              - code: "USD"
                name: "Dólar (USD)"
              - code: "EUR"
                name: "Euro (EUR)"
            providers:
              exchangerate:
                base_url: {base_url}
                retries: 0
            user:
              display_name: "Ana Souza"
        "#
        );
        std::fs::write(file.path(), config_content).expect("Failed to write config file");
    }
}

fn tracked() -> Vec<Currency> {
    vec![
        Currency::new("BRL", "Real (BRL)"),
        Currency::new("USD", "Dólar (USD)"),
        Currency::new("EUR", "Euro (EUR)"),
    ]
}

#[test_log::test(tokio::test)]
async fn test_form_session_against_mock_service() {
    let mock_server = test_utils::create_rates_server().await;
    let provider: Arc<dyn RateProvider> = Arc::new(ExchangeRateApiProvider::new(
        &mock_server.uri(),
        Duration::from_secs(5),
    ));

    let mut form = ConversionForm::new(tracked(), "BRL");
    let mut out = Vec::new();
    let input: &[u8] = b"BRL 100\nEUR abc1.8x\nhelp\nquit\n";

    fxform::cli::form::run(&mut form, provider, input, &mut out)
        .await
        .expect("Form session failed");

    let output = String::from_utf8(out).unwrap();
    info!(%output, "Form session output");
    assert!(output.contains("18.00"));
    assert!(output.contains("published 2024-05-02"));
    assert!(output.contains("`refresh` fetches new rates"));

    assert_eq!(form.screen_state(), ScreenState::RatesLoaded);
    assert_eq!(form.amounts().get("EUR"), Some("1.8"));
    assert_eq!(form.amounts().get("BRL"), Some("10.00"));
    assert_eq!(form.amounts().get("USD"), Some("2.00"));
}

#[test_log::test(tokio::test)]
async fn test_malformed_refetch_keeps_rates() {
    let good_server = test_utils::create_rates_server().await;
    let bad_server = test_utils::create_mock_server(
        "BRL",
        wiremock::ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;
    let good = ExchangeRateApiProvider::new(&good_server.uri(), Duration::from_secs(5));
    let bad = ExchangeRateApiProvider::new(&bad_server.uri(), Duration::from_secs(5));

    let mut form = ConversionForm::new(tracked(), "BRL");
    let ticket = form.begin_fetch();
    let result = good.fetch_rates("BRL").await;
    assert_eq!(form.complete_fetch(ticket, result), FetchOutcome::Installed);
    let before = form.rates().unwrap();

    let ticket = form.begin_fetch();
    let result = bad.fetch_rates("BRL").await;
    assert!(matches!(
        form.complete_fetch(ticket, result),
        FetchOutcome::Failed(fxform::core::FetchError::Parse(_))
    ));

    assert_eq!(*form.rates().unwrap(), *before);
    form.edit("USD", "1").unwrap();
    assert_eq!(form.amounts().get("BRL"), Some("5.00"));
}

#[test_log::test(tokio::test)]
async fn test_late_response_from_abandoned_fetch_is_discarded() {
    let slow_server = test_utils::create_mock_server(
        "BRL",
        wiremock::ResponseTemplate::new(200)
            .set_body_string(r#"{"rates": {"USD": 0.1, "EUR": 0.1}}"#)
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    let fast_server = test_utils::create_rates_server().await;
    let slow = ExchangeRateApiProvider::new(&slow_server.uri(), Duration::from_secs(5));
    let fast = ExchangeRateApiProvider::new(&fast_server.uri(), Duration::from_secs(5));

    let mut form = ConversionForm::new(tracked(), "BRL");
    let first = form.begin_fetch();
    let second = form.begin_fetch();

    let (slow_result, fast_result) =
        tokio::join!(slow.fetch_rates("BRL"), fast.fetch_rates("BRL"));
    assert_eq!(
        form.complete_fetch(second, fast_result),
        FetchOutcome::Installed
    );
    assert_eq!(
        form.complete_fetch(first, slow_result),
        FetchOutcome::Discarded
    );

    assert_eq!(form.rates().unwrap().rate("USD"), Some(0.2));
}

#[test_log::test(tokio::test)]
async fn test_convert_command_with_config() {
    let mock_server = test_utils::create_rates_server().await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri());

    let result = fxform::run_command(
        fxform::AppCommand::Convert {
            currency: "USD".to_string(),
            amount: "25".to_string(),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Convert command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_rates_command_reports_server_failure() {
    let mock_server =
        test_utils::create_mock_server("BRL", wiremock::ResponseTemplate::new(500)).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri());

    let result = fxform::run_command(
        fxform::AppCommand::Rates,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("Rates command should fail");
    assert!(err.to_string().contains("HTTP 500 Internal Server Error"));
}

#[test_log::test(tokio::test)]
async fn test_invalid_config_is_rejected() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        "base_currency: BRL\ncurrencies:\n  - code: USD\n    name: A\n  - code: usd\n    name: B\n",
    )
    .expect("Failed to write config file");

    let result = fxform::run_command(
        fxform::AppCommand::Rates,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    let err = result.expect_err("Duplicate currencies should be rejected");
    assert!(format!("{err:#}").contains("Duplicate currency: USD"));
}

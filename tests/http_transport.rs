//! Integration tests for the reqwest transport against a local server

use cheddar_client::{CheddarClient, CheddarError, ClientConfig, FormData, TransportError};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLANS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plans>
  <plan id="a7d2b5a0" code="FREE"><name>Free</name><recurringChargeAmount>0</recurringChargeAmount></plan>
  <plan id="b8e3c6b1" code="PRO"><name>Pro</name><recurringChargeAmount>19.95</recurringChargeAmount></plan>
</plans>"#;

const CUSTOMER_NOT_FOUND: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<error id="73542" code="404" auxCode="">Customer not found</error>"#;

/// Client pointed at the mock server over plain HTTP
fn client_for(server: &MockServer) -> CheddarClient {
    let address = server.address();
    let config = ClientConfig {
        host: address.ip().to_string(),
        port: address.port(),
        use_tls: false,
    };
    CheddarClient::with_config("user@example.com", "secret", "MY_PRODUCT", config)
}

#[tokio::test]
async fn test_get_all_pricing_plans() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/xml/plans/get/productCode/MY_PRODUCT"))
        .and(header(
            "authorization",
            "Basic dXNlckBleGFtcGxlLmNvbTpzZWNyZXQ=",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLANS_XML))
        .expect(1)
        .mount(&mock_server)
        .await;

    let plans = client_for(&mock_server)
        .get_all_pricing_plans()
        .await
        .unwrap();

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["code"].as_str(), Some("FREE"));
    assert_eq!(plans[0]["recurringChargeAmount"].as_i64(), Some(0));
    assert_eq!(plans[1]["recurringChargeAmount"].as_f64(), Some(19.95));
}

#[tokio::test]
async fn test_form_body_and_encoded_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(
            "/xml/customers/set-item-quantity/productCode/MY_PRODUCT/code/John%20Doe/itemCode/SEATS",
        ))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("quantity=3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<customers><customer code="John Doe"/></customers>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .set_item_quantity("John Doe", "SEATS", 3.0)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result[0]["code"].as_str(), Some("John Doe"));
}

#[tokio::test]
async fn test_create_customer_sends_fields_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/xml/customers/new/productCode/MY_PRODUCT"))
        .and(body_string(
            "code=c1&firstName=Ann&subscription%5BplanCode%5D=PRO",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<customers><customer code="c1"><firstName>Ann</firstName></customer></customers>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data = FormData::new()
        .field("code", "c1")
        .field("firstName", "Ann")
        .field("subscription[planCode]", "PRO");
    let created = client_for(&mock_server)
        .create_customer(data)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created[0]["firstName"].as_str(), Some("Ann"));
}

#[tokio::test]
async fn test_error_document_with_404_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/xml/customers/get/productCode/MY_PRODUCT/code/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string(CUSTOMER_NOT_FOUND))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .get_customer("ghost")
        .await
        .unwrap_err();

    match err {
        CheddarError::ServiceError {
            message, code, id, ..
        } => {
            assert_eq!(message, "Customer not found");
            assert_eq!(code, Some(404));
            assert_eq!(id.as_deref(), Some("73542"));
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_without_xml() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .get_all_customers(None)
        .await
        .unwrap_err();

    match err {
        CheddarError::TransportError(TransportError::HttpStatus { status_code, body }) => {
            assert_eq!(status_code, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("expected status failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Reserve a free port, then release it so nothing listens there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        use_tls: false,
    };
    let client = CheddarClient::with_config("user", "secret", "MY_PRODUCT", config);

    let err = client.get_all_pricing_plans().await.unwrap_err();
    assert!(matches!(
        err,
        CheddarError::TransportError(TransportError::NetworkError(_))
    ));
}

//! ePortal HTTP 로그인 클라이언트.
//!
//! `LoginClient` 포트 구현. 폼 POST 1회 후 응답의 `userIndex`를 해석한다.
//! 모든 실패는 분류된 `LoginOutcome`으로 반환하며 여기서는 재시도하지 않는다.

use async_trait::async_trait;
use campusnet_core::error::CoreError;
use campusnet_core::models::credentials::Credentials;
use campusnet_core::models::outcome::{LoginClassification, LoginOutcome, UserIndex};
use campusnet_core::ports::login_client::LoginClient;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 응답에서 읽는 필드
const USER_INDEX_FIELD: &str = "userIndex";

/// `userIndex` 디코딩 결과 구분자
const SEGMENT_DELIMITER: char = '_';

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// ePortal `InterFace.do?method=login` 클라이언트
pub struct HttpLoginClient {
    client: reqwest::Client,
}

impl HttpLoginClient {
    /// 새 로그인 클라이언트 생성
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self { client })
    }

    /// 포털이 요구하는 고정 키 집합의 폼 본문
    fn form_fields(credentials: &Credentials) -> [(&'static str, &str); 8] {
        [
            ("userId", credentials.account_id()),
            ("password", credentials.encrypted_password()),
            ("service", credentials.service().wire_value()),
            ("queryString", credentials.network_params()),
            ("operatorPwd", ""),
            ("operatorUserId", ""),
            ("validcode", ""),
            ("passwordEncrypt", "true"),
        ]
    }
}

#[async_trait]
impl LoginClient for HttpLoginClient {
    async fn login(&self, credentials: &Credentials) -> LoginOutcome {
        info!("로그인 요청 전송: {}", credentials.account_id());

        let sent = self
            .client
            .post(credentials.target_url())
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
            .form(&Self::form_fields(credentials))
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                warn!("로그인 요청 실패: {e}");
                return LoginOutcome::failure(
                    LoginClassification::NetworkError,
                    None,
                    String::new(),
                    format!("로그인 요청 실패: {e}"),
                );
            }
        };

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("로그인 응답 본문 읽기 실패: {e}");
                return LoginOutcome::failure(
                    LoginClassification::NetworkError,
                    Some(status),
                    String::new(),
                    format!("응답 본문 읽기 실패: {e}"),
                );
            }
        };

        info!("로그인 응답: 상태 코드 {status}, 길이 {}", body.len());
        interpret_response(status, body, credentials.account_id())
    }
}

/// 로그인 응답 본문 해석
///
/// JSON 파싱 → `userIndex` 추출 → 16진수 디코딩 → `_` 분할 → 계정 일치 확인.
/// HTTP 상태 코드는 기록만 하고 분류에는 쓰지 않는다.
pub fn interpret_response(status: u16, body: String, submitted_account: &str) -> LoginOutcome {
    let json: serde_json::Value = match serde_json::from_str(&body) {
        Ok(json) => json,
        Err(e) => {
            warn!("로그인 응답이 JSON 형식이 아님: {e}");
            let diagnostic = format!("응답이 JSON 형식이 아님: {body}");
            return LoginOutcome::failure(
                LoginClassification::BadResponseFormat,
                Some(status),
                body,
                diagnostic,
            );
        }
    };

    let hex_value = match json.get(USER_INDEX_FIELD) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => {
            warn!("userIndex가 문자열이 아님: {other}");
            let diagnostic = format!("userIndex 형식 오류 (문자열 아님): {other}");
            return LoginOutcome::failure(
                LoginClassification::HexDecodeError,
                Some(status),
                body,
                diagnostic,
            );
        }
        None => {
            warn!("로그인 응답에 userIndex 필드 없음");
            return LoginOutcome::failure(
                LoginClassification::MissingField,
                Some(status),
                body,
                "응답에 userIndex 필드 없음",
            );
        }
    };

    let decoded = match decode_hex_text(&hex_value) {
        Ok(text) => text,
        Err(e) => {
            warn!("userIndex 16진수 디코딩 실패: {hex_value}: {e}");
            return LoginOutcome::failure(
                LoginClassification::HexDecodeError,
                Some(status),
                body,
                format!("userIndex 형식 오류: {hex_value} ({e})"),
            );
        }
    };
    debug!("userIndex 디코딩: {decoded}");

    let user_index = match split_user_index(&decoded) {
        Some(index) => index,
        None => {
            warn!("userIndex 데이터 형식 이상, 분할 불가: {decoded}");
            return LoginOutcome::failure(
                LoginClassification::MalformedPayload,
                Some(status),
                body,
                format!("userIndex 세그먼트 부족: {decoded}"),
            );
        }
    };

    if user_index.account_echo != submitted_account {
        warn!(
            "응답 계정 불일치: 제출={submitted_account}, 응답={}",
            user_index.account_echo
        );
    }

    let outcome = LoginOutcome::success(status, body, user_index, submitted_account);
    info!("{}", outcome.diagnostic);
    outcome
}

/// 16진수 → 바이트 → UTF-8 (잘못된 시퀀스는 U+FFFD로 치환)
///
/// 16진수 자체가 잘못된 경우에만 실패한다.
pub fn decode_hex_text(hex_value: &str) -> Result<String, hex::FromHexError> {
    let bytes = hex::decode(hex_value)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `<장치>_<IP>_<계정>[_...]` 분할. 세그먼트가 3개 미만이면 `None`.
pub fn split_user_index(decoded: &str) -> Option<UserIndex> {
    let mut segments = decoded.split(SEGMENT_DELIMITER);
    let device_id = segments.next()?;
    let assigned_ip = segments.next()?;
    let account_echo = segments.next()?;

    Some(UserIndex {
        device_id: device_id.to_string(),
        assigned_ip: assigned_ip.to_string(),
        account_echo: account_echo.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusnet_core::models::credentials::ServiceProvider;

    fn body_for(text: &str) -> String {
        format!(r#"{{"userIndex":"{}","result":"success"}}"#, hex::encode(text))
    }

    fn credentials(url: &str) -> Credentials {
        Credentials::new(
            "stu123",
            "enc-blob",
            ServiceProvider::Cmcc,
            "wlanuserip=10.0.0.5&nasip=172.17.10.1",
            url,
        )
    }

    #[test]
    fn decodes_successful_payload() {
        let outcome = interpret_response(200, body_for("devA_10.0.0.5_stu123"), "stu123");

        assert_eq!(outcome.classification, LoginClassification::Success);
        assert_eq!(outcome.account_consistent, Some(true));
        let index = outcome.user_index.unwrap();
        assert_eq!(index.device_id, "devA");
        assert_eq!(index.assigned_ip, "10.0.0.5");
        assert_eq!(index.account_echo, "stu123");
    }

    #[test]
    fn extra_segments_are_ignored() {
        let outcome = interpret_response(200, body_for("devA_10.0.0.5_stu123_x_y"), "stu123");
        assert!(outcome.is_success());
        assert_eq!(outcome.user_index.unwrap().account_echo, "stu123");
    }

    #[test]
    fn account_mismatch_still_success() {
        let outcome = interpret_response(200, body_for("devA_10.0.0.5_other"), "stu123");
        assert!(outcome.is_success());
        assert_eq!(outcome.account_consistent, Some(false));
    }

    #[test]
    fn non_json_preserves_raw_body() {
        let outcome = interpret_response(200, "not json".to_string(), "stu123");
        assert_eq!(outcome.classification, LoginClassification::BadResponseFormat);
        assert_eq!(outcome.raw_body, "not json");
        assert!(outcome.diagnostic.contains("not json"));
    }

    #[test]
    fn missing_user_index() {
        let outcome = interpret_response(200, r#"{"foo":"bar"}"#.to_string(), "stu123");
        assert_eq!(outcome.classification, LoginClassification::MissingField);
    }

    #[test]
    fn json_array_has_no_user_index() {
        let outcome = interpret_response(200, "[1,2]".to_string(), "stu123");
        assert_eq!(outcome.classification, LoginClassification::MissingField);
    }

    #[test]
    fn invalid_hex_is_hex_decode_error() {
        for bad in [r#"{"userIndex":"zz"}"#, r#"{"userIndex":"abc"}"#, r#"{"userIndex":42}"#] {
            let outcome = interpret_response(200, bad.to_string(), "stu123");
            assert_eq!(
                outcome.classification,
                LoginClassification::HexDecodeError,
                "body: {bad}"
            );
        }
    }

    #[test]
    fn too_few_segments_is_malformed() {
        let outcome = interpret_response(200, body_for("devA_10.0.0.5"), "stu123");
        assert_eq!(outcome.classification, LoginClassification::MalformedPayload);

        let outcome = interpret_response(200, r#"{"userIndex":""}"#.to_string(), "stu123");
        assert_eq!(outcome.classification, LoginClassification::MalformedPayload);
    }

    #[test]
    fn hex_roundtrip_valid_utf8() {
        let text = "설비_10.0.0.5_学生";
        assert_eq!(decode_hex_text(&hex::encode(text)).unwrap(), text);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let decoded = decode_hex_text("6465764aff5f31").unwrap();
        assert_eq!(decoded, "devJ\u{FFFD}_1");
    }

    #[test]
    fn uppercase_hex_accepted() {
        assert_eq!(decode_hex_text("4142").unwrap(), "AB");
        assert_eq!(decode_hex_text("6a6B").unwrap(), "jk");
    }

    #[tokio::test]
    async fn login_posts_fixed_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/eportal/InterFace.do")
            .match_query(mockito::Matcher::UrlEncoded("method".into(), "login".into()))
            .match_header("content-type", FORM_CONTENT_TYPE)
            .match_header("user-agent", mockito::Matcher::Regex("Mozilla/5.0".into()))
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("userId".into(), "stu123".into()),
                mockito::Matcher::UrlEncoded("password".into(), "enc-blob".into()),
                mockito::Matcher::UrlEncoded(
                    "service".into(),
                    ServiceProvider::Cmcc.wire_value().into(),
                ),
                mockito::Matcher::UrlEncoded(
                    "queryString".into(),
                    "wlanuserip=10.0.0.5&nasip=172.17.10.1".into(),
                ),
                mockito::Matcher::UrlEncoded("operatorPwd".into(), "".into()),
                mockito::Matcher::UrlEncoded("validcode".into(), "".into()),
                mockito::Matcher::UrlEncoded("passwordEncrypt".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body_for("devA_10.0.0.5_stu123"))
            .create_async()
            .await;

        let client = HttpLoginClient::new(
            Duration::from_secs(5),
            campusnet_core::config::DEFAULT_USER_AGENT,
        )
        .unwrap();
        let url = format!("{}/eportal/InterFace.do?method=login", server.url());
        let outcome = client.login(&credentials(&url)).await;

        assert!(outcome.is_success(), "{}", outcome.diagnostic);
        assert_eq!(outcome.status_code, Some(200));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_recorded_not_classified() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/login")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let client = HttpLoginClient::new(Duration::from_secs(5), "test-agent").unwrap();
        let outcome = client
            .login(&credentials(&format!("{}/login", server.url())))
            .await;

        assert_eq!(outcome.status_code, Some(502));
        assert_eq!(outcome.classification, LoginClassification::BadResponseFormat);
        assert_eq!(outcome.raw_body, "<html>Bad Gateway</html>");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let client = HttpLoginClient::new(Duration::from_secs(2), "test-agent").unwrap();
        // 예약된 포트 0으로는 연결할 수 없다
        let outcome = client.login(&credentials("http://127.0.0.1:0/login")).await;

        assert_eq!(outcome.classification, LoginClassification::NetworkError);
        assert!(outcome.status_code.is_none());
        assert!(!outcome.diagnostic.is_empty());
    }
}

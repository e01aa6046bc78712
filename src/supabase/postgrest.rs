//! Builder for row queries against the REST table endpoint.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::{read_json, read_text, BackendClient};
use super::error::ClientError;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// Returned with 406 when a single-object request matched no rows.
const NO_ROWS_CODE: &str = "PGRST116";

pub struct QueryBuilder {
    client: BackendClient,
    table: String,
    method: Method,
    params: Vec<(String, String)>,
    prefer: Vec<&'static str>,
    body: Option<serde_json::Value>,
    deferred: Option<ClientError>,
}

impl QueryBuilder {
    pub(crate) fn new(client: BackendClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            method: Method::GET,
            params: Vec::new(),
            prefer: Vec::new(),
            body: None,
            deferred: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.retain(|(k, _)| k != "select");
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    fn filter(mut self, column: &str, expr: String) -> Self {
        self.params.push((column.to_string(), expr));
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, format!("eq.{}", value.to_string()))
    }

    pub fn neq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, format!("neq.{}", value.to_string()))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is.null".to_string())
    }

    pub fn in_list<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let list: Vec<String> = values
            .into_iter()
            .map(|v| {
                let v = v.to_string();
                if v.contains([',', '(', ')', '"']) {
                    format!("\"{}\"", v.replace('"', "\\\""))
                } else {
                    v
                }
            })
            .collect();
        self.filter(column, format!("in.({})", list.join(",")))
    }

    /// Add a sort key. Repeated calls sort by each key in turn.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let key = format!("{}.{}", column, if ascending { "asc" } else { "desc" });
        match self.params.iter_mut().find(|(k, _)| k == "order") {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&key);
            }
            None => self.params.push(("order".to_string(), key)),
        }
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.params.retain(|(k, _)| k != "limit");
        self.params.push(("limit".to_string(), count.to_string()));
        self
    }

    /// Inclusive row range, zero-based.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.params.retain(|(k, _)| k != "limit" && k != "offset");
        self.params.push(("offset".to_string(), from.to_string()));
        self.params
            .push(("limit".to_string(), (to.saturating_sub(from) + 1).to_string()));
        self
    }

    fn with_body<T: Serialize + ?Sized>(mut self, method: Method, rows: &T) -> Self {
        self.method = method;
        match serde_json::to_value(rows) {
            Ok(value) => self.body = Some(value),
            Err(e) => self.deferred = Some(e.into()),
        }
        self.prefer.push("return=representation");
        self
    }

    pub fn insert<T: Serialize + ?Sized>(self, rows: &T) -> Self {
        self.with_body(Method::POST, rows)
    }

    pub fn upsert<T: Serialize + ?Sized>(mut self, rows: &T, on_conflict: Option<&str>) -> Self {
        if let Some(columns) = on_conflict {
            self.params
                .push(("on_conflict".to_string(), columns.to_string()));
        }
        self.prefer.push("resolution=merge-duplicates");
        self.with_body(Method::POST, rows)
    }

    pub fn update<T: Serialize + ?Sized>(self, values: &T) -> Self {
        self.with_body(Method::PATCH, values)
    }

    pub fn delete(mut self) -> Self {
        self.method = Method::DELETE;
        self.prefer.push("return=representation");
        self
    }

    async fn request(self, single: bool) -> Result<reqwest::RequestBuilder, ClientError> {
        if let Some(e) = self.deferred {
            return Err(e);
        }

        let url = self.client.endpoint(&format!("rest/v1/{}", self.table));
        let mut request = self
            .client
            .http()
            .request(self.method, url)
            .query(&self.params);

        if !self.prefer.is_empty() {
            request = request.header("Prefer", self.prefer.join(","));
        }
        if single {
            request = request.header(reqwest::header::ACCEPT, SINGLE_OBJECT);
        }
        if let Some(body) = &self.body {
            request = request.json(body);
        }

        tracing::debug!("Query on table {}", self.table);
        Ok(self.client.authorize(request).await)
    }

    /// Run and decode every returned row.
    pub async fn fetch_many<T: DeserializeOwned>(self) -> Result<Vec<T>, ClientError> {
        read_json(self.request(false).await?).await
    }

    /// Run and decode exactly one row. No rows is a backend error.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        read_json(self.request(true).await?).await
    }

    /// Like [`fetch_one`](Self::fetch_one) but no rows is `None`.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, ClientError> {
        match self.fetch_one().await {
            Ok(row) => Ok(Some(row)),
            Err(ClientError::Api(e)) if e.code.as_deref() == Some(NO_ROWS_CODE) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run, discarding any returned rows.
    pub async fn execute(self) -> Result<(), ClientError> {
        read_text(self.request(false).await?).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{PublicConfig, ServerConfig};
    use crate::models::{NewProfile, NewService, Profile, ProfileRole, Service, ServiceUpdate};
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, headers, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn public_config(server: &MockServer) -> PublicConfig {
        PublicConfig {
            url: url::Url::parse(&server.uri()).unwrap(),
            anon_key: "anon".to_string(),
        }
    }

    #[test]
    fn test_repeated_order_keys_are_joined() {
        let client = BackendClient::public(&PublicConfig {
            url: url::Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: "anon".to_string(),
        });
        let query = client
            .from("portfolio_projects")
            .order("is_featured", false)
            .order("display_order", true)
            .range(10, 19);

        assert!(query
            .params
            .contains(&("order".to_string(), "is_featured.desc,display_order.asc".to_string())));
        assert!(query.params.contains(&("offset".to_string(), "10".to_string())));
        assert!(query.params.contains(&("limit".to_string(), "10".to_string())));
    }

    #[test]
    fn test_in_list_quotes_reserved_characters() {
        let client = BackendClient::public(&PublicConfig {
            url: url::Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: "anon".to_string(),
        });
        let query = client.from("blog_tags").in_list("name", ["rust", "a,b"]);

        assert_eq!(
            query.params,
            vec![("name".to_string(), "in.(rust,\"a,b\")".to_string())]
        );
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/services"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({
                "title": "Consulting",
                "description": "Architecture reviews",
                "icon": "compass"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": "0d7c4a52-6a8e-4f0a-9a53-2a7f0e8b1c11",
                "title": "Consulting",
                "description": "Architecture reviews",
                "icon": "compass",
                "display_order": 0,
                "is_active": true,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::public(&public_config(&server));
        let rows: Vec<Service> = client
            .table::<Service>()
            .insert(&NewService {
                title: "Consulting".to_string(),
                description: "Architecture reviews".to_string(),
                icon: "compass".to_string(),
                display_order: None,
                is_active: None,
            })
            .fetch_many()
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_active);
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_admin_upsert_uses_service_key() {
        let server = MockServer::start().await;
        let id = Uuid::parse_str("5b1c2f6e-8a57-4a3e-9d6c-7f0e2b9d4a11").unwrap();
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("on_conflict", "id"))
            .and(header("apikey", "service"))
            .and(header("authorization", "Bearer service"))
            .and(headers(
                "prefer",
                vec!["resolution=merge-duplicates", "return=representation"],
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": id,
                "email": "me@example.com",
                "display_name": null,
                "avatar_url": null,
                "role": "admin",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let admin = crate::supabase::admin::admin_client(&ServerConfig {
            public: public_config(&server),
            service_role_key: Some(secrecy::SecretString::new("service".to_string())),
            jwt_secret: None,
        })
        .unwrap();

        let rows: Vec<Profile> = admin
            .table::<Profile>()
            .upsert(
                &NewProfile {
                    id,
                    email: "me@example.com".to_string(),
                    display_name: None,
                    avatar_url: None,
                    role: Some(ProfileRole::Admin),
                },
                Some("id"),
            )
            .fetch_many()
            .await
            .unwrap();

        assert_eq!(rows[0].role, ProfileRole::Admin);
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_columns() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/services"))
            .and(query_param("id", "eq.0d7c4a52-6a8e-4f0a-9a53-2a7f0e8b1c11"))
            .and(body_json(json!({ "is_active": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "0d7c4a52-6a8e-4f0a-9a53-2a7f0e8b1c11",
                "title": "Consulting",
                "description": "Architecture reviews",
                "icon": "compass",
                "display_order": 0,
                "is_active": false,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-02T00:00:00Z"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::public(&public_config(&server));
        let rows: Vec<Service> = client
            .table::<Service>()
            .update(&ServiceUpdate {
                is_active: Some(false),
                ..Default::default()
            })
            .eq("id", "0d7c4a52-6a8e-4f0a-9a53-2a7f0e8b1c11")
            .fetch_many()
            .await
            .unwrap();

        assert!(!rows[0].is_active);
    }

    #[tokio::test]
    async fn test_delete_with_filter() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/project_images"))
            .and(query_param("project_id", "eq.42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::public(&public_config(&server));
        client
            .from("project_images")
            .delete()
            .eq("project_id", 42)
            .execute()
            .await
            .unwrap();
    }
}

use log::debug;
use reqwest::{
    blocking::{Client, RequestBuilder},
    StatusCode,
};
use serde_json::Value;

use super::SocrataApi;
use crate::errors::MetatabErr;

/// Talks to the SODA and views API of a Socrata instance.
#[derive(Debug)]
pub struct SocrataClient {
    domain: String,
    app_token: String,
    username: String,
    password: String,
    http: Client,
}

impl SocrataClient {
    const APP_TOKEN_HEADER: &'static str = "X-App-Token";

    /// Connect to the instance at `url`, which may include the `https://` scheme.
    pub fn new(url: &str, app_token: &str, username: &str, password: &str) -> Result<Self, MetatabErr> {
        let domain = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_owned();

        if domain.is_empty() {
            return Err(MetatabErr::BadUrl(url.to_owned(), "no host name".to_owned()));
        }

        Ok(SocrataClient {
            domain,
            app_token: app_token.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            http: Client::builder().build()?,
        })
    }

    fn views_url(&self) -> String {
        format!("https://{}/api/views.json", self.domain)
    }

    fn view_url(&self, dataset_id: &str) -> String {
        format!("https://{}/api/views/{}.json", self.domain, dataset_id)
    }

    fn resource_url(&self, dataset_id: &str) -> String {
        format!("https://{}/resource/{}.json", self.domain, dataset_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.username, Some(&self.password))
            .header(Self::APP_TOKEN_HEADER, &self.app_token)
    }

    fn send(request: RequestBuilder) -> Result<Value, MetatabErr> {
        let response = request.send()?.error_for_status()?;
        Ok(response.json()?)
    }
}

impl SocrataApi for SocrataClient {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn create(&self, view: &Value) -> Result<Value, MetatabErr> {
        debug!("POST {}", self.views_url());
        Self::send(self.authorized(self.http.post(&self.views_url())).json(view))
    }

    fn get_metadata(&self, dataset_id: &str) -> Result<Value, MetatabErr> {
        debug!("GET {}", self.view_url(dataset_id));
        Self::send(self.authorized(self.http.get(&self.view_url(dataset_id))))
    }

    fn update_metadata(&self, dataset_id: &str, metadata: &Value) -> Result<Value, MetatabErr> {
        debug!("PUT {}", self.view_url(dataset_id));
        Self::send(
            self.authorized(self.http.put(&self.view_url(dataset_id)))
                .json(metadata),
        )
    }

    fn get(&self, dataset_id: &str) -> Result<Value, MetatabErr> {
        let request = self
            .authorized(self.http.get(&self.resource_url(dataset_id)))
            .query(&[("$limit", "1")]);

        match Self::send(request) {
            Err(MetatabErr::Http(err)) if err.status() == Some(StatusCode::NOT_FOUND) => {
                Err(MetatabErr::DatasetNotFound(dataset_id.to_owned()))
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_domain_from_url() {
        let client = SocrataClient::new("https://data.example.gov/", "token", "user", "pw").unwrap();
        assert_eq!(client.domain(), "data.example.gov");

        let client = SocrataClient::new("data.example.gov", "", "", "").unwrap();
        assert_eq!(client.domain(), "data.example.gov");

        assert!(SocrataClient::new("https://", "", "", "").is_err());
    }

    #[test]
    fn test_endpoints() {
        let client = SocrataClient::new("https://data.example.gov", "", "", "").unwrap();

        assert_eq!(client.views_url(), "https://data.example.gov/api/views.json");
        assert_eq!(
            client.view_url("abcd-1234"),
            "https://data.example.gov/api/views/abcd-1234.json"
        );
        assert_eq!(
            client.resource_url("abcd-1234"),
            "https://data.example.gov/resource/abcd-1234.json"
        );
    }
}

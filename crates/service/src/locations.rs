//! Brazilian postal code (ViaCEP) and municipality (IBGE) lookups, cached in memory.

use std::sync::Arc;
use std::time::Duration;

use configs::LocationsConfig;
use models::user::validate_state;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ServiceError;

const CACHE_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub cep: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

#[derive(Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

#[derive(Deserialize)]
struct IbgeCity {
    nome: String,
}

/// Strip punctuation; a CEP has exactly eight digits.
pub fn normalize_cep(raw: &str) -> Result<String, ServiceError> {
    let digits: String = raw.chars().filter(|c| !matches!(c, '-' | '.' | ' ')).collect();
    if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::validation("CEP must have 8 digits"));
    }
    Ok(digits)
}

fn is_not_found(erro: &Option<Value>) -> bool {
    match erro {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

#[derive(Clone)]
pub struct LocationClient {
    http: reqwest::Client,
    viacep_base: String,
    ibge_base: String,
    addresses: Cache<String, Address>,
    cities: Cache<String, Arc<Vec<String>>>,
}

impl LocationClient {
    pub fn new(cfg: &LocationsConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Gateway(format!("http client: {e}")))?;
        let ttl = Duration::from_secs(cfg.cache_ttl_secs);
        Ok(Self {
            http,
            viacep_base: cfg.viacep_base.trim_end_matches('/').to_string(),
            ibge_base: cfg.ibge_base.trim_end_matches('/').to_string(),
            addresses: Cache::builder().max_capacity(CACHE_CAPACITY).time_to_live(ttl).build(),
            cities: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ServiceError> {
        let resp = self.http.get(url).send().await.map_err(|e| ServiceError::Gateway(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Gateway(format!("{url} returned {}", resp.status())));
        }
        resp.json().await.map_err(|e| ServiceError::Gateway(e.to_string()))
    }

    pub async fn lookup_cep(&self, raw: &str) -> Result<Address, ServiceError> {
        let cep = normalize_cep(raw)?;
        if let Some(hit) = self.addresses.get(&cep).await {
            return Ok(hit);
        }
        let body: ViaCepResponse = self.get_json(&format!("{}/ws/{}/json/", self.viacep_base, cep)).await?;
        if is_not_found(&body.erro) {
            return Err(ServiceError::not_found("CEP"));
        }
        let address = Address {
            cep: cep.clone(),
            street: body.logradouro,
            district: body.bairro,
            city: body.localidade,
            state: body.uf,
        };
        self.addresses.insert(cep, address.clone()).await;
        Ok(address)
    }

    /// Municipality names of a state, sorted.
    pub async fn cities(&self, uf: &str) -> Result<Arc<Vec<String>>, ServiceError> {
        let uf = validate_state(uf)?;
        if let Some(hit) = self.cities.get(&uf).await {
            return Ok(hit);
        }
        let url = format!("{}/api/v1/localidades/estados/{}/municipios", self.ibge_base, uf);
        let list: Vec<IbgeCity> = self.get_json(&url).await?;
        let mut names: Vec<String> = list.into_iter().map(|c| c.nome).collect();
        names.sort();
        debug!(%uf, count = names.len(), "ibge_cities_loaded");
        let names = Arc::new(names);
        self.cities.insert(uf, names.clone()).await;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cep_normalization() {
        assert_eq!(normalize_cep("01310-100").unwrap(), "01310100");
        assert_eq!(normalize_cep("01.310-100").unwrap(), "01310100");
        assert!(normalize_cep("1310-100").is_err());
        assert!(normalize_cep("0131010a").is_err());
    }

    #[test]
    fn viacep_error_flag() {
        let r: ViaCepResponse = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(is_not_found(&r.erro));
        let r: ViaCepResponse = serde_json::from_str(r#"{"erro": "true"}"#).unwrap();
        assert!(is_not_found(&r.erro));
        let r: ViaCepResponse = serde_json::from_str(
            r#"{"cep":"01310-100","logradouro":"Avenida Paulista","bairro":"Bela Vista","localidade":"São Paulo","uf":"SP"}"#,
        )
        .unwrap();
        assert!(!is_not_found(&r.erro));
        assert_eq!(r.localidade, "São Paulo");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_network() {
        let client = LocationClient::new(&LocationsConfig {
            viacep_base: "http://127.0.0.1:9".into(),
            ibge_base: "http://127.0.0.1:9".into(),
            ..LocationsConfig::default()
        })
        .unwrap();
        assert!(matches!(client.lookup_cep("123").await, Err(ServiceError::Validation(_))));
        assert!(client.cities("XX").await.is_err());
    }
}

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A search scope: where to look and in which order results are sorted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub id: String,
    pub base_url: String,
    /// Query fragment such as `ordem=MOST_RECENT`, empty for the site default
    pub sort_suffix: Option<String>,
}

impl SearchTarget {
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        sort_suffix: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            sort_suffix,
        }
    }
}

/// Address components parsed out of the free-text address line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
}

/// Characteristics block split into the slots the data table cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub area: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub suites: Option<String>,
    pub parking: Option<String>,
    pub others: Vec<String>,
    pub all: Vec<String>,
}

/// Core listing data model, one row of the data table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub advertiser: Option<String>,
    pub transaction_type: Option<String>,
    pub price: Option<String>,
    pub address: Option<String>,
    pub address_parts: AddressComponents,
    pub characteristics: Characteristics,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub condo_fee: Option<String>,
    pub property_tax: Option<String>,
    pub images: Vec<String>,
    pub extracted_at: DateTime<Local>,
    pub link: String,
}

/// Column order of the data table
pub const LISTING_COLUMNS: [&str; 24] = [
    "nome_anunciante",
    "tipo_transacao",
    "preco_venda",
    "endereco",
    "logradouro",
    "numero",
    "bairro",
    "municipio",
    "uf",
    "metragem",
    "quartos",
    "banheiros",
    "suites",
    "vagas",
    "outros",
    "caracteristicas",
    "latitude",
    "longitude",
    "condominio",
    "iptu",
    "qtd_imagens",
    "urls_imagens",
    "data_extracao",
    "link",
];

impl ListingRecord {
    /// A record is worth keeping only if it has a price or an address
    pub fn is_meaningful(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.price) || present(&self.address)
    }

    /// Renders the record as a data table row in `LISTING_COLUMNS` order
    pub fn to_row(&self) -> Vec<String> {
        let cell = |v: &Option<String>| v.clone().unwrap_or_default();
        let json_list =
            |v: &Vec<String>| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string());
        let chars = &self.characteristics;
        let parts = &self.address_parts;

        vec![
            cell(&self.advertiser),
            cell(&self.transaction_type),
            cell(&self.price),
            cell(&self.address),
            cell(&parts.logradouro),
            cell(&parts.numero),
            cell(&parts.bairro),
            cell(&parts.municipio),
            cell(&parts.uf),
            cell(&chars.area),
            cell(&chars.bedrooms),
            cell(&chars.bathrooms),
            cell(&chars.suites),
            cell(&chars.parking),
            json_list(&chars.others),
            json_list(&chars.all),
            cell(&self.latitude),
            cell(&self.longitude),
            cell(&self.condo_fee),
            cell(&self.property_tax),
            self.images.len().to_string(),
            self.images.join("; "),
            self.extracted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.link.clone(),
        ]
    }
}

/// One failed try at extracting a listing
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    /// 1-based attempt number
    pub index: u32,
    pub last_failure: String,
    pub debug_artifact: Option<PathBuf>,
}

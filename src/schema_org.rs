//! Schema.org JSON-LD projection of a response envelope
//!
//! Produces a `Place` suitable for embedding in dataset metadata: the
//! geometry as `geo`, every distinct property as an `additionalProperty`
//! and every distinct mapped vocabulary term as a `keywords` entry.

use crate::geometry::Geometry;
use crate::response::ResponseEnvelope;
use serde::Serialize;

pub const SCHEMA_ORG_CONTEXT: &str = "https://schema.org/";
pub const ENVO_TERM_SET: &str = "https://ontobee.org/ontology/ENVO";

const SRS_NAME: &str = "Spatial reference system";
const SRS_PROPERTY_ID: &str = "https://dbpedia.org/page/Spatial_reference_system";
const SRS_VALUE: &str = "https://www.w3.org/2003/01/geo/wgs84_pos";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@type")]
    pub place_type: &'static str,
    pub description: Option<String>,
    pub geo: Option<Geo>,
    #[serde(rename = "additionalProperty")]
    pub additional_property: Vec<PropertyValue>,
    pub keywords: Vec<DefinedTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "@type")]
pub enum Geo {
    GeoShape {
        /// "lat lon lat lon ..." over the outer ring
        polygon: String,
    },
    GeoCoordinates {
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyValue {
    #[serde(rename = "@type")]
    pub value_type: &'static str,
    pub name: String,
    #[serde(rename = "propertyID", skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinedTerm {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub term_type: &'static str,
    pub name: String,
    #[serde(rename = "inDefinedTermSet")]
    pub in_defined_term_set: &'static str,
    #[serde(rename = "termCode")]
    pub term_code: String,
}

/// Keep the first position of each key, holding the last value seen for it
fn dedup_by_key<T>(items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        let k = key(&item);
        match out.iter().position(|existing| key(existing) == k) {
            Some(i) => out[i] = item,
            None => out.push(item),
        }
    }
    out
}

fn geo(envelope: &ResponseEnvelope) -> Option<Geo> {
    match Geometry::from_geojson(&envelope.geometry).ok()? {
        Geometry::Point(p) => Some(Geo::GeoCoordinates {
            latitude: p.y,
            longitude: p.x,
            elevation: p.z,
        }),
        Geometry::Polygon(rings) => {
            let polygon = rings
                .first()?
                .iter()
                .map(|p| format!("{} {}", p.y, p.x))
                .collect::<Vec<_>>()
                .join(" ");
            Some(Geo::GeoShape { polygon })
        }
    }
}

fn additional_properties(envelope: &ResponseEnvelope) -> Vec<PropertyValue> {
    let srs = PropertyValue {
        value_type: "PropertyValue",
        name: SRS_NAME.to_string(),
        property_id: Some(SRS_PROPERTY_ID.to_string()),
        value: SRS_VALUE.to_string(),
    };
    let properties = envelope.environment.iter().flat_map(|record| {
        record.properties.iter().map(|(name, value)| PropertyValue {
            value_type: "PropertyValue",
            name: name.to_string(),
            property_id: None,
            value: value.to_string(),
        })
    });

    let mut out = vec![srs];
    out.extend(dedup_by_key(properties, |p| p.name.clone()));
    out
}

fn keywords(envelope: &ResponseEnvelope) -> Vec<DefinedTerm> {
    let terms = envelope
        .environment
        .iter()
        .flat_map(|record| record.mapped_terms.iter())
        .map(|term| DefinedTerm {
            id: term.uri.clone(),
            term_type: "DefinedTerm",
            name: term.label.clone(),
            in_defined_term_set: ENVO_TERM_SET,
            term_code: term.uri.rsplit('/').next().unwrap_or_default().to_string(),
        });
    dedup_by_key(terms, |t| t.name.clone())
}

impl ResponseEnvelope {
    /// Project the envelope onto a Schema.org `Place`
    pub fn to_schema_org(&self) -> Place {
        Place {
            context: SCHEMA_ORG_CONTEXT,
            id: self.identifier.clone(),
            place_type: "Place",
            description: self.description.clone(),
            geo: geo(self),
            additional_property: additional_properties(self),
            keywords: keywords(self),
        }
    }
}

//! # Crawlit: Declarative Record Extraction
//!
//! Crawlit extracts typed, validated records out of HTML documents. An item
//! type is declared as a set of named fields; each field says where to find
//! its value (a CSS or XPath-style selector), how many matches to keep, and
//! how to transform them.
//!
//! ## Features
//!
//! - **Typed fields**: string, integer, float, boolean, email and raw fields
//! - **Fixed-order pipelines**: collapse → normalize → vocabulary → parse → user stages
//! - **Controlled vocabularies**: token-boundary matching with merged multi-choice results
//! - **All-or-nothing loads**: the first failing field drops the whole record
//! - **YAML schemas**: item types declared in YAML with named transforms
//!
//! ## Example
//!
//! ```
//! use crawlit::{Choices, Field, FieldValue, HtmlExtractor, ItemType};
//!
//! let listing = ItemType::new("Listing")
//!     .field("title", Field::string("h1::text").build()?)?
//!     .field("price", Field::float(".price::text").delimiter(',').build()?)?
//!     .field(
//!         "amenities",
//!         Field::string(".description::text")
//!             .choices(Choices::mapping([
//!                 ("microwave", vec!["kitchen", "microwave"]),
//!                 ("shower", vec!["bathroom", "shower"]),
//!             ]))
//!             .multi_choices(true)
//!             .build()?,
//!     )?;
//!
//! let page = HtmlExtractor::parse(
//!     r#"<h1> Sunny flat </h1>
//!        <p class="price">1250,50 EUR</p>
//!        <p class="description">nice flat with microwave and shower</p>"#,
//! );
//! let record = listing.load(&HtmlExtractor::new(), &page).unwrap();
//!
//! assert_eq!(record.get("title"), Some(&FieldValue::from("Sunny flat")));
//! assert_eq!(record.get("price"), Some(&FieldValue::Float(1250.5)));
//! assert_eq!(
//!     record.get("amenities"),
//!     Some(&FieldValue::from(vec!["bathroom", "kitchen", "microwave", "shower"]))
//! );
//! # Ok::<(), crawlit::SchemaError>(())
//! ```

// Core modules
pub mod choices;
pub mod error;
pub mod fields;
pub mod item;
pub mod pipeline;
pub mod transform_registry;
pub mod value;

// Extraction engines
pub mod extraction;
pub mod html;

// Configuration and output
pub mod schema;
pub mod serialization;

// Re-export key types
pub use choices::{ChoiceMatcher, Choices, CHOICE_SEPARATORS};
pub use error::{DropItem, SchemaError};
pub use extraction::{Dialect, Extractor, PathExpr, SubPattern};
pub use fields::{Field, FieldBinding, FieldBuilder, FieldKind};
pub use html::HtmlExtractor;
pub use item::{ItemType, Record, RecordId};
pub use pipeline::{
    build_pipeline, Conversion, Multiplicity, Pipeline, PipelineConfig, Stage, StageKind,
};
pub use schema::{FieldDef, ItemDef};
pub use serialization::{NdjsonWriter, SerializationError};
pub use transform_registry::{TransformFn, TransformRegistry, UserStage};
pub use value::FieldValue;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// HTTP-like verb a method binding answers to.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Verb {
    /// Retrieval without side effects.
    Get,
    /// Default verb for remote calls.
    #[default]
    Post,
    /// Replacement of a resource.
    Put,
    /// Removal of a resource.
    Delete,
    /// Capability probing.
    Options,
}

pub(crate) mod client;
pub(crate) mod xml;

pub(crate) use client::{DavClient, NodeMetadata};

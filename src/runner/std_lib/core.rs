//! Core whitelist registration.
//!
//! Registration runs in phases so that every module sees the types the
//! others declare: structs first, then members, then inheritance (which
//! copies members), then casts (which reference inherited methods).

use tracing::debug;

use crate::runner::definition::DefinitionBuilder;
use crate::runner::ds::error::DefinitionError;
use crate::runner::ds::native::NativeCatalog;

use super::collections;
use super::functions;
use super::lang;
use super::utility;

/// Every native class the default whitelist binds against.
pub fn native_catalog() -> NativeCatalog {
    let mut catalog = NativeCatalog::new();
    lang::add_natives(&mut catalog);
    collections::add_natives(&mut catalog);
    functions::add_natives(&mut catalog);
    utility::add_natives(&mut catalog);
    catalog
}

/// Register the default whitelist with the builder.
pub fn register_core_whitelist(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    lang::declare(builder)?;
    functions::declare(builder)?;
    collections::declare(builder)?;
    utility::declare(builder)?;

    lang::register(builder)?;
    functions::register(builder)?;
    collections::register(builder)?;
    utility::register(builder)?;

    // Parents before children.
    lang::inherit(builder)?;
    functions::inherit(builder)?;
    collections::inherit(builder)?;
    utility::inherit(builder)?;

    lang::add_casts(builder)?;
    utility::add_casts(builder)?;
    debug!("core whitelist registered");
    Ok(())
}

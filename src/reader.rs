//! Support for enumerating available readers

use crate::{card::Card, context::Context, context::CARD_POLL_INTERVAL, Result};
use log::info;
use std::{
    borrow::Cow,
    ffi::{CStr, CString},
    fmt, thread,
};

/// An individual reader (or reader slot) known to a [`Context`]
pub struct Reader<'ctx> {
    /// Name of this reader
    name: CString,

    /// PC/SC context
    ctx: &'ctx Context,
}

impl<'ctx> Reader<'ctx> {
    /// Create a new reader from its name and context
    pub(crate) fn new(ctx: &'ctx Context, name: &CStr) -> Self {
        Self {
            name: name.to_owned(),
            ctx,
        }
    }

    /// Get this reader's name
    pub fn name(&self) -> Cow<'_, str> {
        self.name.to_string_lossy()
    }

    /// Get this reader's name as reported by the resource manager
    pub fn name_cstr(&self) -> &CStr {
        &self.name
    }

    /// Is a card currently present in this reader?
    pub fn is_card_present(&self) -> Result<bool> {
        self.ctx.is_card_present(&self.name)
    }

    /// Block until the card is removed from this reader
    pub fn wait_until_card_removed(&self) -> Result<()> {
        while self.is_card_present()? {
            thread::sleep(CARD_POLL_INTERVAL);
        }

        Ok(())
    }

    /// Connect to the card in this reader
    pub fn connect(&self) -> Result<Card<'ctx>> {
        info!("trying to connect to reader '{}'", self.name());

        let card = self.ctx.pcsc().connect(
            &self.name,
            pcsc::ShareMode::Shared,
            pcsc::Protocols::ANY,
        )?;

        Card::new(card, self.name.clone())
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader").field("name", &self.name).finish()
    }
}

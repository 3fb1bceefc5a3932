//! PC/SC resource manager context

use crate::{reader::Reader, Error, Result};
use log::{debug, trace};
use std::{ffi::CStr, thread, time::Duration};

/// Interval at which reader state is polled while waiting for a card
pub const CARD_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Scope of a resource manager context
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Scope {
    /// Operations are performed within the domain of the user
    User,

    /// Operations are performed within the domain of the terminal
    Terminal,

    /// Operations are performed within the domain of the system
    #[default]
    System,
}

impl From<Scope> for pcsc::Scope {
    fn from(scope: Scope) -> pcsc::Scope {
        match scope {
            Scope::User => pcsc::Scope::User,
            Scope::Terminal => pcsc::Scope::Terminal,
            Scope::System => pcsc::Scope::System,
        }
    }
}

/// Session with the smart card resource manager.
///
/// Readers and cards obtained from a context borrow it, so the context can
/// only be released once all of them have been dropped or disconnected.
pub struct Context {
    inner: pcsc::Context,
}

impl Context {
    /// Establish a context with [`Scope::System`]
    pub fn establish() -> Result<Self> {
        Self::establish_with_scope(Scope::default())
    }

    /// Establish a context with the given scope
    pub fn establish_with_scope(scope: Scope) -> Result<Self> {
        let inner = pcsc::Context::establish(scope.into())?;
        debug!("established PC/SC context ({:?})", scope);
        Ok(Self { inner })
    }

    /// Release the context.
    ///
    /// Dropping a context releases it as well, ignoring any error.
    pub fn release(self) -> Result<()> {
        self.inner.release().map_err(|(_, e)| Error::from(e))?;
        debug!("released PC/SC context");
        Ok(())
    }

    /// List all readers known to the resource manager
    pub fn list_readers(&self) -> Result<Vec<Reader<'_>>> {
        // ensure PC/SC context is valid
        self.inner.is_valid()?;

        let len = match self.inner.list_readers_len() {
            Ok(len) => len,
            Err(pcsc::Error::NoReadersAvailable) => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut reader_names = vec![0u8; len];

        let readers = match self.inner.list_readers(&mut reader_names) {
            Ok(names) => names.map(|name| Reader::new(self, name)).collect(),
            Err(pcsc::Error::NoReadersAvailable) => vec![],
            Err(e) => return Err(e.into()),
        };

        Ok(readers)
    }

    /// List the readers which currently hold a card
    pub fn list_readers_with_card(&self) -> Result<Vec<Reader<'_>>> {
        let readers = self.list_readers()?;

        if readers.is_empty() {
            return Ok(readers);
        }

        let mut states: Vec<_> = readers
            .iter()
            .map(|reader| pcsc::ReaderState::new(reader.name_cstr(), pcsc::State::UNAWARE))
            .collect();

        self.get_status_change(&mut states)?;

        Ok(readers
            .into_iter()
            .zip(states)
            .filter(|(_, state)| state.event_state().contains(pcsc::State::PRESENT))
            .map(|(reader, _)| reader)
            .collect())
    }

    /// Block until a card is present in any reader, returning that reader.
    ///
    /// Returns immediately if a card is already present.
    pub fn wait_for_card_present(&self) -> Result<Reader<'_>> {
        loop {
            if let Some(reader) = self.list_readers_with_card()?.into_iter().next() {
                debug!("card present in reader '{}'", reader.name());
                return Ok(reader);
            }

            thread::sleep(CARD_POLL_INTERVAL);
        }
    }

    /// Is a card present in the named reader?
    pub(crate) fn is_card_present(&self, name: &CStr) -> Result<bool> {
        let mut states = [pcsc::ReaderState::new(name, pcsc::State::UNAWARE)];
        self.get_status_change(&mut states)?;
        Ok(states[0].event_state().contains(pcsc::State::PRESENT))
    }

    /// Borrow the underlying PC/SC context
    pub(crate) fn pcsc(&self) -> &pcsc::Context {
        &self.inner
    }

    /// Query the current state of the given readers without blocking
    fn get_status_change(&self, states: &mut [pcsc::ReaderState]) -> Result<()> {
        match self.inner.get_status_change(Duration::ZERO, states) {
            Ok(()) | Err(pcsc::Error::Timeout) => (),
            Err(e) => return Err(e.into()),
        }

        for state in states.iter() {
            trace!(
                "reader '{}': {:?}",
                state.name().to_string_lossy(),
                state.event_state()
            );
        }

        Ok(())
    }
}

//! As-of (backward-fill) join of onsets onto events.
//!
//! Both streams must be sorted by (date, time). The sweep walks them with
//! two cursors, carrying the latest onset seen so far; each event is stamped
//! with the most recent onset at or before its own timestamp. On equal
//! timestamps the onset is consumed first, so an event stamped exactly at an
//! onset belongs to that onset.
//!
//! One linear pass, O(n + m), no search.

use std::iter::Peekable;

use crate::offset;
use crate::records::{AnnotatedEventRecord, Assignment, EventRecord, OnsetEvent};

pub struct AsOfJoin<E, O>
where
    E: Iterator<Item = EventRecord>,
    O: Iterator<Item = OnsetEvent>,
{
    events: E,
    onsets: Peekable<O>,
    current: Option<OnsetEvent>,
}

impl<E, O> AsOfJoin<E, O>
where
    E: Iterator<Item = EventRecord>,
    O: Iterator<Item = OnsetEvent>,
{
    pub fn new<IE, IO>(events: IE, onsets: IO) -> Self
    where
        IE: IntoIterator<IntoIter = E>,
        IO: IntoIterator<IntoIter = O>,
    {
        Self {
            events: events.into_iter(),
            onsets: onsets.into_iter().peekable(),
            current: None,
        }
    }
}

impl<E, O> Iterator for AsOfJoin<E, O>
where
    E: Iterator<Item = EventRecord>,
    O: Iterator<Item = OnsetEvent>,
{
    type Item = (EventRecord, Assignment);

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.events.next()?;
        let key = event.at();

        while let Some(onset) = self.onsets.next_if(|o| o.at() <= key) {
            self.current = Some(onset);
        }

        Some((event, Assignment::from(self.current)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

/// Assign onsets and compute raw time-of-day offsets
pub fn assign_onsets(events: &[EventRecord], onsets: &[OnsetEvent]) -> Vec<AnnotatedEventRecord> {
    AsOfJoin::new(events.iter().cloned(), onsets.iter().copied())
        .map(|(event, assignment)| {
            let offset = assignment
                .onset()
                .map(|onset| offset::offset(&event, &onset));
            AnnotatedEventRecord::new(event, assignment, offset)
        })
        .collect()
}

//! Filter-then-project queries over in-memory record sequences.

use std::fmt;
use std::sync::Arc;

use mapforge_core::{BooleanGraph, EvalError, ProjectionGraph, Record, Value};

/// A compiled pre-filter composed with a compiled projection.
///
/// Both graphs are shared; cloning a query is cheap.
#[derive(Debug, Clone)]
pub struct Query {
    filter: Option<Arc<BooleanGraph>>,
    projection: Arc<ProjectionGraph>,
}

impl Query {
    pub fn new(filter: Option<Arc<BooleanGraph>>, projection: Arc<ProjectionGraph>) -> Self {
        Self { filter, projection }
    }

    pub fn filter(&self) -> Option<&Arc<BooleanGraph>> {
        self.filter.as_ref()
    }

    pub fn projection(&self) -> &Arc<ProjectionGraph> {
        &self.projection
    }

    /// Lazily filters and projects `source`, preserving its order.
    pub fn run<I>(&self, source: I) -> QueryRun<I::IntoIter>
    where
        I: IntoIterator<Item = Record>,
    {
        QueryRun {
            query: self.clone(),
            source: source.into_iter(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("source")?;
        if let Some(filter) = &self.filter {
            write!(f, ".Where({})", filter)?;
        }
        write!(f, ".Select({})", self.projection)
    }
}

/// Iterator returned by [`Query::run`].
///
/// Yields one projected record per source record that passes the filter.
/// A record whose evaluation fails yields the error; iteration continues
/// with the next record.
#[derive(Debug)]
pub struct QueryRun<I> {
    query: Query,
    source: I,
}

impl<I> Iterator for QueryRun<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Result<Record, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let value = Value::Record(self.source.next()?);
            if let Some(filter) = &self.query.filter {
                match filter.test(&value) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => return Some(Err(err)),
                }
            }
            return Some(self.query.projection.apply(&value));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.source.size_hint();
        match self.query.filter {
            Some(_) => (0, upper),
            None => self.source.size_hint(),
        }
    }
}

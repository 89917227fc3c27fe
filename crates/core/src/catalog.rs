use tracing::debug;

use crate::assembler;
use crate::collation::Collation;
use crate::error::Result;
use crate::model::{GlossaryDocument, GlossaryPage};
use crate::normalize::normalize;
use crate::planner::{FilterPlan, GlossaryFilter, Pagination};
use crate::pool::ConnectionSource;
use crate::schema;

/// Read-side entry point: filtered pages, single-term lookups and store
/// checks over any [`ConnectionSource`].
pub struct GlossaryCatalog<S> {
    source: S,
    collation: Collation,
}

impl<S: ConnectionSource> GlossaryCatalog<S> {
    pub fn new(source: S, collation: Collation) -> Self {
        Self { source, collation }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    /// Count, id page and hydration run in order on one connection inside a
    /// read transaction, so the total and the page see the same snapshot.
    /// The id window and the final sort both use the catalog's collation.
    pub fn list(&self, filter: &GlossaryFilter, pagination: Pagination) -> Result<GlossaryPage> {
        let plan = FilterPlan::new(filter);
        self.source.with_connection(|conn| {
            self.collation.register(conn)?;
            let tx = conn.unchecked_transaction()?;
            let total = plan.count(&tx)?;
            let ids = plan.page_ids(&tx, &pagination)?;
            let mut data = if ids.is_empty() {
                Vec::new()
            } else {
                normalize(assembler::hydrate(&tx, &ids)?)
            };
            tx.commit()?;
            self.collation.sort_documents(&mut data);
            debug!(total, returned = data.len(), "glossary page assembled");
            Ok(GlossaryPage {
                total,
                page: pagination.page(),
                limit: pagination.limit(),
                data,
            })
        })
    }

    /// Exact lookup on the trimmed term. `Ok(None)` means no such term.
    pub fn find_by_term(&self, term: &str) -> Result<Option<GlossaryDocument>> {
        let term = term.trim();
        self.source.with_connection(|conn| {
            let raw = assembler::lookup_by_term(conn, term)?;
            let found = normalize(raw).into_iter().next();
            debug!(term, found = found.is_some(), "glossary term lookup");
            Ok(found)
        })
    }

    pub fn database_name(&self) -> Result<String> {
        self.source.with_connection(schema::database_name)
    }

    pub fn missing_tables(&self) -> Result<Vec<String>> {
        self.source.with_connection(schema::missing_tables)
    }
}

//! Parameter sets (individuals) evolved by the optimizer.
//!
//! An [`Individual`] is a flat, ordered mapping from parameter name to
//! [`Gene`]. The names and gene kinds are fixed once, when the seed is read
//! from the configuration document, and shared by every individual of a run
//! through an [`Arc<ParameterSchema>`].

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Gene {
    /// Floating-point magnitude: perturbed by mutation, averaged by crossover.
    Numeric(f64),
    /// Any other value: copied verbatim, never perturbed.
    Categorical(Value),
}

impl Gene {
    /// Classify a document value.
    ///
    /// Only numbers written as floating-point literals are numeric. Integer
    /// literals (e.g. particle counts, step indices) are treated as opaque.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) if n.is_f64() => match n.as_f64() {
                Some(v) => Gene::Numeric(v),
                None => Gene::Categorical(value.clone()),
            },
            other => Gene::Categorical(other.clone()),
        }
    }

    /// Convert back to a document value.
    pub fn to_value(&self) -> Value {
        match self {
            Gene::Numeric(v) => Value::from(*v),
            Gene::Categorical(v) => v.clone(),
        }
    }

    /// Kind tag of this gene.
    pub fn kind(&self) -> GeneKind {
        match self {
            Gene::Numeric(_) => GeneKind::Numeric,
            Gene::Categorical(_) => GeneKind::Categorical,
        }
    }

    /// Numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Gene::Numeric(v) => Some(*v),
            Gene::Categorical(_) => None,
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gene::Numeric(v) => write!(f, "{v}"),
            Gene::Categorical(v) => write!(f, "{v}"),
        }
    }
}

/// Kind of a gene slot in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneKind {
    Numeric,
    Categorical,
}

/// Ordered parameter names and their kinds, shared by a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSchema {
    names: Vec<String>,
    kinds: Vec<GeneKind>,
}

impl ParameterSchema {
    /// Parameter names in document order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Gene kinds in document order.
    pub fn kinds(&self) -> &[GeneKind] {
        &self.kinds
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no parameters.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of numeric (evolvable) parameters.
    pub fn numeric_count(&self) -> usize {
        self.kinds
            .iter()
            .filter(|k| **k == GeneKind::Numeric)
            .count()
    }

    /// Position of a parameter by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// One candidate parameter set.
#[derive(Debug, Clone)]
pub struct Individual {
    schema: Arc<ParameterSchema>,
    genes: Vec<Gene>,
}

impl Individual {
    /// Build a seed individual from the `simulation` section of a document.
    ///
    /// This fixes the schema for every individual derived from it.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut names = Vec::with_capacity(map.len());
        let mut kinds = Vec::with_capacity(map.len());
        let mut genes = Vec::with_capacity(map.len());

        for (name, value) in map {
            let gene = Gene::from_value(value);
            names.push(name.clone());
            kinds.push(gene.kind());
            genes.push(gene);
        }

        Self {
            schema: Arc::new(ParameterSchema { names, kinds }),
            genes,
        }
    }

    /// Build an individual sharing this one's schema.
    ///
    /// Callers must keep every gene's kind aligned with the schema.
    pub(crate) fn with_genes(&self, genes: Vec<Gene>) -> Self {
        debug_assert_eq!(genes.len(), self.genes.len());
        debug_assert!(
            genes
                .iter()
                .zip(self.schema.kinds())
                .all(|(g, k)| g.kind() == *k)
        );
        Self {
            schema: Arc::clone(&self.schema),
            genes,
        }
    }

    /// Shared schema.
    pub fn schema(&self) -> &Arc<ParameterSchema> {
        &self.schema
    }

    /// Genes in schema order.
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Look up a gene by parameter name.
    pub fn get(&self, name: &str) -> Option<&Gene> {
        self.schema.index_of(name).map(|i| &self.genes[i])
    }

    /// Look up a numeric parameter by name.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Gene::as_f64)
    }

    /// Iterate `(name, gene)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Gene)> {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.genes.iter())
    }

    /// Whether two individuals share the same parameter schema.
    pub fn same_schema(&self, other: &Individual) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) || *self.schema == *other.schema
    }

    /// Convert to a document object, preserving parameter order.
    pub fn to_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(name, gene)| (name.to_string(), gene.to_value()))
            .collect()
    }
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.same_schema(other) && self.genes == other.genes
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, gene)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{name} = {gene}")?;
        }
        Ok(())
    }
}

//! # Vector Codec
//!
//! Flattens a structured model (named parameter blocks) into one dense vector
//! and restores it from a [`ShapeTemplate`].
//!
//! Blocks are always traversed in declaration order, so vectors produced from
//! different clients or rounds line up position for position.
//!
//! ```text
//! fc1.weight [2,3] ─┐
//! fc1.bias   [2]   ─┼─▶ [w00 w01 w02 w10 w11 w12 b0 b1 o0]
//! out.bias   [1]   ─┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GroupwiseError, Result};

/// Name and shape of one parameter block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockShape {
    pub name: String,
    pub shape: Vec<usize>,
}

impl BlockShape {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self { name: name.into(), shape }
    }

    /// Number of scalar elements in the block
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Ordered shape metadata used to restore flattened vectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeTemplate {
    blocks: Vec<BlockShape>,
}

impl ShapeTemplate {
    pub fn new(blocks: Vec<BlockShape>) -> Self {
        Self { blocks }
    }

    /// Builder-style block append
    pub fn with_block(mut self, name: impl Into<String>, shape: Vec<usize>) -> Self {
        self.blocks.push(BlockShape::new(name, shape));
        self
    }

    pub fn blocks(&self) -> &[BlockShape] {
        &self.blocks
    }

    /// Total element count across every block
    pub fn total_len(&self) -> usize {
        self.blocks.iter().map(BlockShape::numel).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// One named parameter tensor, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBlock {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl ParameterBlock {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(GroupwiseError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { name: name.into(), shape, values })
    }

    pub fn zeros(name: impl Into<String>, shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            name: name.into(),
            shape,
            values: vec![0.0; len],
        }
    }

    pub fn numel(&self) -> usize {
        self.values.len()
    }
}

/// A model as an ordered list of parameter blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredModel {
    blocks: Vec<ParameterBlock>,
}

impl StructuredModel {
    pub fn new(blocks: Vec<ParameterBlock>) -> Self {
        Self { blocks }
    }

    /// All-zero model matching a template
    pub fn zeros(template: &ShapeTemplate) -> Self {
        Self {
            blocks: template
                .blocks()
                .iter()
                .map(|b| ParameterBlock::zeros(b.name.clone(), b.shape.clone()))
                .collect(),
        }
    }

    pub fn blocks(&self) -> &[ParameterBlock] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&ParameterBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Shape template describing this model
    pub fn template(&self) -> ShapeTemplate {
        ShapeTemplate::new(
            self.blocks
                .iter()
                .map(|b| BlockShape::new(b.name.clone(), b.shape.clone()))
                .collect(),
        )
    }

    pub fn numel(&self) -> usize {
        self.blocks.iter().map(ParameterBlock::numel).sum()
    }

    /// Concatenate blocks in declaration order
    pub fn flatten(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.numel());
        for block in &self.blocks {
            out.extend_from_slice(&block.values);
        }
        out
    }
}

/// Template-checked flatten/restore
#[derive(Debug, Clone)]
pub struct VectorCodec {
    template: ShapeTemplate,
}

impl VectorCodec {
    pub fn new(template: ShapeTemplate) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &ShapeTemplate {
        &self.template
    }

    /// Length D of every vector this codec produces
    pub fn dimension(&self) -> usize {
        self.template.total_len()
    }

    /// Flatten a model after checking it conforms to the template
    pub fn flatten(&self, model: &StructuredModel) -> Result<Vec<f64>> {
        self.check_conforms(model)?;
        Ok(model.flatten())
    }

    /// Exact inverse of [`VectorCodec::flatten`]
    pub fn restore(&self, vector: &[f64]) -> Result<StructuredModel> {
        let expected = self.template.total_len();
        if vector.len() != expected {
            return Err(GroupwiseError::ShapeMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let mut offset = 0;
        let mut blocks = Vec::with_capacity(self.template.blocks().len());
        for shape in self.template.blocks() {
            let len = shape.numel();
            blocks.push(ParameterBlock {
                name: shape.name.clone(),
                shape: shape.shape.clone(),
                values: vector[offset..offset + len].to_vec(),
            });
            offset += len;
        }

        Ok(StructuredModel::new(blocks))
    }

    fn check_conforms(&self, model: &StructuredModel) -> Result<()> {
        let expected = self.template.blocks();
        let actual = model.blocks();

        if expected.len() != actual.len() {
            return Err(GroupwiseError::BlockMismatch(format!(
                "template has {} blocks, model has {}",
                expected.len(),
                actual.len()
            )));
        }

        for (want, got) in expected.iter().zip(actual) {
            if want.name != got.name || want.shape != got.shape {
                return Err(GroupwiseError::BlockMismatch(format!(
                    "expected {}{:?}, found {}{:?}",
                    want.name, want.shape, got.name, got.shape
                )));
            }
            if got.values.len() != want.numel() {
                return Err(GroupwiseError::ShapeMismatch {
                    expected: want.numel(),
                    actual: got.values.len(),
                });
            }
        }

        Ok(())
    }
}

//! Running a [`PipelineBuilder`] against one or more inputs (spec §4.1
//! "Execution operations", §5 "Concurrency & resource model").

use std::sync::Arc;

use crate::error::{IconLayerError, Result};
use crate::gpu::GpuResources;
use crate::types::{DepthBuffer, RgbaBuffer};

use super::context::ExecutionContext;
use super::{DataType, PipelineBuilder};

/// The result of running a [`PipelineBuilder`] to completion: the final
/// context plus the data type its last operation produced.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The operations that were actually run to produce this execution
    /// (used to validate `execute_from` prerequisites for further
    /// branching).
    handle: PipelineBuilder,
    /// The context as left by the last operation.
    pub context: ExecutionContext,
}

impl Execution {
    /// Run `pipeline` once against `input`.
    pub async fn execute(
        pipeline: &PipelineBuilder,
        gpu: &Arc<GpuResources>,
        input: RgbaBuffer,
        seed: u64,
    ) -> Result<Self> {
        let ctx = ExecutionContext::from_input(input, seed);
        Self::run_from(pipeline, gpu, ctx, 0).await
    }

    /// Run `pipeline` once against `input`, additionally binding `depth` at
    /// `depthBuffer`.
    pub async fn execute_with_depth(
        pipeline: &PipelineBuilder,
        gpu: &Arc<GpuResources>,
        input: RgbaBuffer,
        depth: DepthBuffer,
        seed: u64,
    ) -> Result<Self> {
        let ctx = ExecutionContext::from_input(input, seed).with_depth(depth);
        Self::run_from(pipeline, gpu, ctx, 0).await
    }

    /// Run `pipeline` once per input, sequentially, returning one
    /// [`Execution`] per input in order.
    pub async fn execute_many(
        pipeline: &PipelineBuilder,
        gpu: &Arc<GpuResources>,
        inputs: Vec<RgbaBuffer>,
        seed: u64,
    ) -> Result<Vec<Self>> {
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            out.push(Self::execute(pipeline, gpu, input, seed).await?);
        }
        Ok(out)
    }

    /// Start from a shallow copy of `parent`'s context and run only the
    /// operations of `pipeline` not already present in `parent`. Requires
    /// `parent`'s operation sequence to be a prefix of `pipeline`'s.
    pub async fn execute_from(
        pipeline: &PipelineBuilder,
        gpu: &Arc<GpuResources>,
        parent: &Execution,
    ) -> Result<Self> {
        if !parent.handle.is_prefix_of(pipeline) {
            return Err(IconLayerError::InvalidOperationSequence(
                "parent execution's operations are not a prefix of this pipeline".into(),
            ));
        }
        let ctx = parent.context.clone();
        Self::run_from(pipeline, gpu, ctx, parent.handle.operations().len()).await
    }

    /// Run several branch pipelines against the same `parent` concurrently,
    /// one `tokio` task per branch (spec §5 "independent executions ...
    /// run on independent tasks and may execute in parallel").
    pub async fn execute_branches(
        branches: Vec<PipelineBuilder>,
        gpu: Arc<GpuResources>,
        parent: Arc<Execution>,
    ) -> Vec<Result<Execution>> {
        let mut tasks = Vec::with_capacity(branches.len());
        for branch in branches {
            let gpu = gpu.clone();
            let parent = parent.clone();
            tasks.push(tokio::spawn(async move {
                Execution::execute_from(&branch, &gpu, &parent).await
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(r) => results.push(r),
                Err(join_err) => results.push(Err(IconLayerError::ExecutionFailed(format!(
                    "branch task panicked: {join_err}"
                )))),
            }
        }
        results
    }

    async fn run_from(
        pipeline: &PipelineBuilder,
        gpu: &Arc<GpuResources>,
        mut ctx: ExecutionContext,
        start_index: usize,
    ) -> Result<Self> {
        for op in &pipeline.operations()[start_index..] {
            op.run(&mut ctx, gpu).await?;
        }
        Ok(Self {
            handle: pipeline.clone(),
            context: ctx,
        })
    }

    /// The data type produced by the last executed operation.
    #[must_use]
    pub fn output_type(&self) -> DataType {
        self.handle
            .operations()
            .last()
            .map(|op| op.output_type())
            .unwrap_or(DataType::None)
    }
}

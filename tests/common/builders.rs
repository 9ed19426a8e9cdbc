use analysis_dispatch::config::PoolConfig;
use analysis_dispatch::models::WorkChunk;

pub fn chunk(id: &str) -> WorkChunk {
    WorkChunk::new(id, "component")
        .with_blob(format!("{id}.js"), format!("export const {id} = 1;"))
        .with_context(format!("context for {id}"))
}

/// Chunks `c0`, `c1`, ... in order
pub fn chunks(count: usize) -> Vec<WorkChunk> {
    (0..count).map(|i| chunk(&format!("c{i}"))).collect()
}

pub fn fixed_config(workers: usize) -> PoolConfig {
    PoolConfig {
        min_workers: 1,
        max_workers: workers,
        dynamic_scaling: false,
        ..PoolConfig::default()
    }
}

pub fn dynamic_config(min: usize, max: usize) -> PoolConfig {
    PoolConfig {
        min_workers: min,
        max_workers: max,
        dynamic_scaling: true,
        ..PoolConfig::default()
    }
}

use std::sync::Arc;

use confmux_core::{Key, KeyValue, Mapper, MapperNode, Provider, Repository, Result, Schema, Value, convert};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

struct Generated {
    name: &'static str,
    weight: i64,
    keys: Vec<Key>,
}

impl Provider for Generated {
    fn name(&self) -> &str {
        self.name
    }

    fn weight(&self) -> i64 {
        self.weight
    }

    fn set_up(&self, repo: &Repository) -> Result<()> {
        for key in &self.keys {
            repo.register_key(key.clone(), self.name)?;
        }
        Ok(())
    }

    fn get(&self, key: &Key) -> Option<Value> {
        Some(Value::from(key.len().to_string()))
    }
}

fn generated_keys() -> Vec<Key> {
    (0..10)
        .flat_map(|svc| (0..10).map(move |field| Key::new(&format!("svc{svc}.field{field}"))))
        .collect()
}

fn ready_repository() -> Repository {
    let repo = Repository::new();
    repo.register_provider(Arc::new(Generated {
        name: "defaults",
        weight: 10,
        keys: generated_keys(),
    }))
    .unwrap();
    repo.register_provider(Arc::new(Generated {
        name: "env",
        weight: 30,
        keys: generated_keys().into_iter().step_by(3).collect(),
    }))
    .unwrap();
    repo.define_schema(Schema::map([(
        "*",
        Schema::map([("*", Schema::converter(convert::to_int))]),
    )]))
    .unwrap();
    repo.set_up().unwrap();
    repo
}

fn repository_get_benchmark(c: &mut Criterion) {
    let repo = ready_repository();

    c.bench_function("Repository::get (leaf)", |b| {
        b.iter(|| repo.get(black_box("svc3.field7")).unwrap())
    });

    c.bench_function("Repository::get (composite)", |b| {
        b.iter(|| repo.get(black_box("svc3")).unwrap())
    });
}

fn schema_lookup_benchmark(c: &mut Criterion) {
    let mut schema = MapperNode::new();
    schema
        .define_schema(Schema::map([
            ("server", Schema::map([("port", Schema::converter(convert::to_int))])),
            ("plugins", Schema::map([("*", Schema::map([("enabled", Schema::converter(convert::to_bool))]))])),
        ]))
        .unwrap();

    c.bench_function("MapperNode::map (wildcard)", |b| {
        b.iter(|| {
            schema
                .map(black_box(KeyValue::new("plugins.auth.enabled", "yes")))
                .unwrap()
        })
    });
}

criterion_group!(benches, repository_get_benchmark, schema_lookup_benchmark);
criterion_main!(benches);

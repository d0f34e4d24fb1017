use forgekit::modules::blocks::BlocksCache;
use forgekit::modules::crafts::{CraftsCache, RecipeBook};
use forgekit::modules::items::ItemsCache;
use forgekit::cache::{LoadContext, ModuleCache};
use forgekit::error::CoreResult;
use forgekit::sched::ManualScheduler;
use forgekit::{Config, NamespacedKey, Runtime, RuntimeError, Scheduler};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

fn config_with_content() -> Config {
    toml::from_str(
        r#"
        barrier_poll_ms = 10

        [[modules."core:blocks".blocks]]
        key = "blocks:stone_block"
        state_id = 4001
        display_name = "Stone Block"
        ingredients = ["core:stone", "core:stone"]

        [[modules."core:items".items]]
        key = "items:wrench"
        model_data = 500
        display_name = "Wrench"
        ingredients = ["core:iron_ingot"]
        "#,
    )
    .unwrap()
}

fn build(cfg: Config) -> (Runtime, Arc<ManualScheduler>, RecipeBook) {
    let manual = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = manual.clone();
    let mut runtime = Runtime::new(Arc::new(cfg), scheduler);

    let book = RecipeBook::new();
    runtime
        .add_module(Box::new(BlocksCache::new(book.clone()).unwrap()))
        .unwrap();
    runtime
        .add_module(Box::new(ItemsCache::new(book.clone()).unwrap()))
        .unwrap();
    runtime
        .add_module(Box::new(CraftsCache::new(book.clone()).unwrap()))
        .unwrap();

    (runtime, manual, book)
}

fn key(s: &str) -> NamespacedKey {
    s.parse().unwrap()
}

#[test]
fn recipes_wait_for_the_crafts_module() {
    let (mut runtime, manual, book) = build(config_with_content());

    // dependents first: their recipe actions are parked on barriers
    runtime.load(&key("core:blocks")).unwrap();
    runtime.load(&key("core:items")).unwrap();

    manual.tick();
    assert!(book.is_empty());
    assert_eq!(manual.live_tasks(), 2);

    // the registries themselves are live before the barrier fires
    let blocks = runtime.cache_for(&key("core:blocks")).unwrap();
    let cache = blocks.cache_as::<BlocksCache>().unwrap();
    assert_eq!(cache.by_state(4001).unwrap().display_name, "Stone Block");

    runtime.load(&key("core:crafts")).unwrap();
    manual.tick();

    assert_eq!(book.len(), 2);
    // both polls self-cancelled after draining
    assert_eq!(manual.live_tasks(), 0);

    manual.tick();
    assert_eq!(book.len(), 2);
}

#[test]
fn reload_rearms_a_fresh_barrier_without_double_draining() {
    let (mut runtime, manual, book) = build(config_with_content());

    runtime.load_all().unwrap();
    manual.tick();
    assert_eq!(book.len(), 2);

    // reload blocks and crafts; the stale barrier must not drain again
    runtime.unload(&key("core:blocks")).unwrap();
    runtime.unload(&key("core:crafts")).unwrap();
    assert!(book.is_empty());

    runtime.load(&key("core:blocks")).unwrap();
    manual.tick();
    assert_eq!(book.len(), 0);

    runtime.load(&key("core:crafts")).unwrap();
    manual.tick();

    // blocks republished once; items' barrier fired long ago and is gone
    assert_eq!(book.len(), 1);
    assert_eq!(manual.live_tasks(), 0);
}

#[test]
fn load_state_is_queryable_through_the_container() {
    let (mut runtime, _manual, _book) = build(config_with_content());

    assert!(!runtime.cache_for(&key("core:blocks")).unwrap().is_loaded());
    runtime.load(&key("core:blocks")).unwrap();
    assert!(runtime.cache_for(&key("core:blocks")).unwrap().is_loaded());
    assert!(runtime.loaded_board().is_loaded(&key("core:blocks")));

    let err = runtime.load(&key("core:blocks")).unwrap_err();
    assert!(matches!(err, RuntimeError::Lifecycle(_)));

    let err = runtime.cache_for(&key("core:anomalies")).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownModule(_)));
}

struct OrderCache {
    module: NamespacedKey,
    log: Arc<Mutex<Vec<String>>>,
}

impl ModuleCache for OrderCache {
    fn module(&self) -> &NamespacedKey {
        &self.module
    }

    fn on_load(&mut self, _ctx: &mut LoadContext<'_, '_>) -> CoreResult<()> {
        self.log.lock().push(format!("load {}", self.module));
        Ok(())
    }

    fn on_unload(&mut self) -> CoreResult<()> {
        self.log.lock().push(format!("unload {}", self.module));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn shutdown_unloads_in_reverse_load_order() {
    let manual = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = manual.clone();
    let mut runtime = Runtime::new(Arc::new(Config::default()), scheduler);

    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    for name in ["blocks", "decor", "items"] {
        runtime
            .add_module(Box::new(OrderCache {
                module: NamespacedKey::core(name).unwrap(),
                log: log.clone(),
            }))
            .unwrap();
    }

    runtime.load_all().unwrap();
    runtime.shutdown();

    let seen: Vec<String> = log.lock().clone();
    assert_eq!(
        seen,
        vec![
            "load core:blocks",
            "load core:decor",
            "load core:items",
            "unload core:items",
            "unload core:decor",
            "unload core:blocks",
        ]
    );

    // everything is unloaded; a fresh start works
    runtime.load_all().unwrap();
    assert!(runtime.loaded_board().is_loaded(&key("core:decor")));
}

#[test]
fn duplicate_module_is_rejected() {
    let manual = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = manual.clone();
    let mut runtime = Runtime::new(Arc::new(Config::default()), scheduler);

    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let cache = |log: &Arc<Mutex<Vec<String>>>| OrderCache {
        module: NamespacedKey::core("blocks").unwrap(),
        log: log.clone(),
    };

    runtime.add_module(Box::new(cache(&log))).unwrap();
    let err = runtime.add_module(Box::new(cache(&log))).unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateModule(_)));
}

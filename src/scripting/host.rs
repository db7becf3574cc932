use bevy_ecs::prelude::Entity;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, FnPtr, Scope, AST};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

use crate::config::ScriptingConfig;
use crate::profiler::{EntryPoint, SampleSummary, ScriptProfiler};
use crate::rules::ActorInfo;
use crate::scripting::actor::{ScriptActor, ScriptPlayer};
use crate::scripting::catalogue::is_identifier;
use crate::scripting::{
    fatal, CapabilityFilter, CommandCatalogue, CommandGroupDescriptor, ScriptHostError, ScriptValue, HOST_LOG_TARGET,
    SCRIPT_LOG_TARGET,
};
use crate::viewport::ViewportHandle;
use crate::world::{PlayerId, WeakWorld, WorldHandle};

/// Profiler sample wrapped around every `Tick` call.
/// Host functions that are always bound and can never be claimed by a map actor.
const HOST_FUNCTIONS: [&str; 3] = ["FatalError", "print", "debug"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub name: String,
    pub code: String,
}

impl ScriptSource {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self { name: name.into(), code: code.into() }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptHostError> {
        let path = path.as_ref();
        let code = fs::read_to_string(path)
            .map_err(|source| ScriptHostError::Io { path: path.to_path_buf(), source })?;
        Ok(Self { name: path.display().to_string(), code })
    }
}

struct ScriptLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl ScriptLog {
    fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}

pub(crate) struct HostState {
    pub(crate) world: WeakWorld,
    viewport: ViewportHandle,
    catalogue: CommandCatalogue,
    filter: CapabilityFilter,
    pub(crate) fatal_error: Cell<bool>,
    disposed: Cell<bool>,
    globals: RefCell<BTreeMap<String, Dynamic>>,
    reserved: BTreeSet<String>,
    log: RefCell<ScriptLog>,
    echo_to_console: bool,
    host: RefCell<Weak<ScriptHost>>,
}

impl HostState {
    pub(crate) fn push_log(&self, line: String) {
        self.log.borrow_mut().push(line);
    }
}

/// What native commands see of their host: the world, the viewport and the
/// capability filter. Cheap to clone.
#[derive(Clone)]
pub struct HostContext(Rc<HostState>);

impl HostContext {
    pub fn world(&self) -> Result<WorldHandle, Box<EvalAltResult>> {
        self.0.world.upgrade().ok_or_else(|| "The world is no longer available".into())
    }

    pub fn viewport(&self) -> &ViewportHandle {
        &self.0.viewport
    }

    pub fn catalogue(&self) -> &CommandCatalogue {
        &self.0.catalogue
    }

    pub fn command_groups(&self, info: &ActorInfo) -> Rc<[CommandGroupDescriptor]> {
        self.0.filter.filter(info)
    }

    pub fn host(&self) -> Weak<ScriptHost> {
        self.0.host.borrow().clone()
    }

    pub fn fatal_error_occurred(&self) -> bool {
        self.0.fatal_error.get()
    }

    pub fn report_fatal_error(&self, message: &str) {
        fatal::escalate(&self.0, message);
    }

    pub fn actor(&self, entity: Entity) -> Option<ScriptActor> {
        let world = self.0.world.upgrade()?;
        let info = world.borrow().actor_info(entity)?;
        Some(ScriptActor::new(entity, info, self.clone()))
    }

    /// Script value for an actor, or unit once the actor has been released.
    pub fn actor_value(&self, entity: Entity) -> Dynamic {
        self.actor(entity).map_or(Dynamic::UNIT, Dynamic::from)
    }

    pub fn player(&self, id: PlayerId) -> Option<ScriptPlayer> {
        let world = self.0.world.upgrade()?;
        let exists = world.borrow().player(id).is_some();
        exists.then(|| ScriptPlayer::new(id, self.clone()))
    }

    pub fn player_value(&self, id: PlayerId) -> Dynamic {
        self.player(id).map_or(Dynamic::UNIT, Dynamic::from)
    }

    fn script_output(&self, text: &str) {
        info!(target: SCRIPT_LOG_TARGET, "{text}");
        if self.0.echo_to_console {
            println!("Script debug: {text}");
        }
        self.0.push_log(text.to_string());
    }

    fn lookup_global(&self, name: &str) -> Option<Dynamic> {
        self.0.globals.borrow().get(name).cloned()
    }
}

/// Owns the interpreter for one match and contains every script failure.
pub struct ScriptHost {
    engine: Engine,
    ast: AST,
    scope: RefCell<Scope<'static>>,
    context: HostContext,
    profiler: RefCell<ScriptProfiler>,
    has_tick: bool,
    has_world_loaded: bool,
    world_loaded: Cell<bool>,
}

impl ScriptHost {
    /// Builds the interpreter, binds the catalogue's globals and runs the
    /// top level of every source in order.
    pub fn new(
        world: &WorldHandle,
        viewport: ViewportHandle,
        sources: &[ScriptSource],
        catalogue: CommandCatalogue,
        config: &ScriptingConfig,
    ) -> Result<Rc<Self>, ScriptHostError> {
        catalogue.validate()?;
        let filter = CapabilityFilter::new(&catalogue);
        let reserved: BTreeSet<String> = HOST_FUNCTIONS.iter().map(|name| name.to_string()).collect();
        for global in catalogue.globals() {
            if reserved.contains(global.name) {
                return Err(ScriptHostError::DuplicateGlobal(global.name.to_string()));
            }
        }
        let context = HostContext(Rc::new(HostState {
            world: world.downgrade(),
            viewport,
            catalogue,
            filter,
            fatal_error: Cell::new(false),
            disposed: Cell::new(false),
            globals: RefCell::new(BTreeMap::new()),
            reserved,
            log: RefCell::new(ScriptLog { lines: VecDeque::new(), capacity: config.log_capacity }),
            echo_to_console: config.echo_to_console,
            host: RefCell::new(Weak::new()),
        }));

        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.disable_symbol("eval");
        context.0.catalogue.register_all(&mut engine);
        register_host_functions(&mut engine, &context);

        let globals: Vec<(String, Dynamic)> = context
            .0
            .catalogue
            .globals()
            .iter()
            .map(|global| (global.name.to_string(), (global.create)(&context)))
            .collect();
        context.0.globals.borrow_mut().extend(globals);

        let mut ast = AST::empty();
        for source in sources {
            let mut compiled = engine.compile(&source.code).map_err(|err| ScriptHostError::Parse {
                source_name: source.name.clone(),
                message: err.to_string(),
            })?;
            compiled.set_source(source.name.as_str());
            ast = ast.merge(&compiled);
        }
        let has_tick = defines_entry_point(&ast, "Tick");
        let has_world_loaded = defines_entry_point(&ast, "WorldLoaded");

        let host = Rc::new(Self {
            engine,
            ast,
            scope: RefCell::new(Scope::new()),
            context,
            profiler: RefCell::new(ScriptProfiler::new()),
            has_tick,
            has_world_loaded,
            world_loaded: Cell::new(false),
        });
        *host.context.0.host.borrow_mut() = Rc::downgrade(&host);

        {
            let mut scope = host.scope.borrow_mut();
            host.engine
                .run_ast_with_scope(&mut scope, &host.ast)
                .map_err(|err| ScriptHostError::Load(err.to_string()))?;
        }
        info!(
            target: HOST_LOG_TARGET,
            sources = sources.len(),
            has_tick,
            has_world_loaded,
            "script host ready"
        );
        Ok(host)
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    /// Binds `name` to a live actor. Names already taken by globals, host
    /// functions or other handles are refused and left untouched.
    pub fn register_entity_handle(&self, name: &str, actor: Entity) -> Result<(), ScriptHostError> {
        let state = &self.context.0;
        if state.reserved.contains(name) || state.globals.borrow().contains_key(name) {
            return Err(ScriptHostError::NameCollision(name.to_string()));
        }
        if !is_identifier(name) {
            return Err(ScriptHostError::InvalidGlobalName(name.to_string()));
        }
        let value = self.context.actor(actor).ok_or(ScriptHostError::UnknownActor(actor))?;
        state.globals.borrow_mut().insert(name.to_string(), Dynamic::from(value));
        debug!(target: HOST_LOG_TARGET, name, actor = actor.index(), "bound map actor");
        Ok(())
    }

    pub fn notify_world_loaded(&self) {
        if self.fatal_error_occurred() || self.is_disposed() || self.world_loaded.replace(true) {
            return;
        }
        if !self.has_world_loaded {
            return;
        }
        let result =
            ScriptProfiler::measure(&self.profiler, EntryPoint::WorldLoaded, || self.call_entry_point("WorldLoaded"));
        if let Err(err) = result {
            self.report_fatal_error(&err.to_string());
        }
    }

    pub fn tick(&self) {
        if self.fatal_error_occurred() || self.is_disposed() || !self.has_tick {
            return;
        }
        let result = ScriptProfiler::measure(&self.profiler, EntryPoint::Tick, || self.call_entry_point("Tick"));
        if let Err(err) = result {
            self.report_fatal_error(&err.to_string());
        }
    }

    pub fn report_fatal_error(&self, message: &str) {
        self.context.report_fatal_error(message);
    }

    pub fn fatal_error_occurred(&self) -> bool {
        self.context.fatal_error_occurred()
    }

    pub fn is_disposed(&self) -> bool {
        self.context.0.disposed.get()
    }

    /// Idempotent. Calls already in flight are not interrupted.
    pub fn dispose(&self) {
        if self.context.0.disposed.replace(true) {
            return;
        }
        info!(target: HOST_LOG_TARGET, "script host disposed");
    }

    pub fn resolve_command_groups(&self, info: &ActorInfo) -> Rc<[CommandGroupDescriptor]> {
        self.context.command_groups(info)
    }

    /// Calls a script function with native arguments. Skipped once the host
    /// is fatal or disposed. Extra arguments are dropped and missing ones are
    /// passed as unit so callbacks may declare fewer parameters.
    pub fn invoke(&self, function: &FnPtr, args: &[ScriptValue]) -> Result<Dynamic, Box<EvalAltResult>> {
        if self.fatal_error_occurred() || self.is_disposed() {
            return Ok(Dynamic::UNIT);
        }
        let mut values: Vec<Dynamic> = args.iter().map(|arg| arg.to_dynamic(&self.context)).collect();
        if let Some(arity) = self.callback_arity(function) {
            values.resize(arity, Dynamic::UNIT);
        }
        ScriptProfiler::measure(&self.profiler, EntryPoint::Callback, || {
            function.call::<Dynamic>(&self.engine, &self.ast, values)
        })
    }

    /// Like `invoke`, with failures escalated instead of returned.
    pub fn invoke_contained(&self, function: &FnPtr, args: &[ScriptValue]) {
        if let Err(err) = self.invoke(function, args) {
            self.report_fatal_error(&err.to_string());
        }
    }

    pub fn take_logs(&self) -> Vec<String> {
        self.context.0.log.borrow_mut().lines.drain(..).collect()
    }

    pub fn timings(&self) -> Vec<SampleSummary> {
        self.profiler.borrow().summaries()
    }

    pub fn tick_samples(&self) -> u64 {
        self.profiler.borrow().calls(EntryPoint::Tick)
    }

    fn call_entry_point(&self, name: &str) -> Result<(), Box<EvalAltResult>> {
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let mut scope = self.scope.borrow_mut();
        self.engine.call_fn_with_options::<Dynamic>(options, &mut scope, &self.ast, name, ()).map(|_| ())
    }

    fn callback_arity(&self, function: &FnPtr) -> Option<usize> {
        let declared = self.ast.iter_functions().find(|f| f.name == function.fn_name())?.params.len();
        Some(declared.saturating_sub(function.curry().len()))
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        // globals hold values that point back at the host state
        self.context.0.globals.borrow_mut().clear();
    }
}

fn defines_entry_point(ast: &AST, name: &str) -> bool {
    ast.iter_functions().any(|f| f.name == name && f.params.is_empty())
}

fn register_host_functions(engine: &mut Engine, context: &HostContext) {
    let ctx = context.clone();
    engine.register_fn("FatalError", move |message: &str| ctx.report_fatal_error(message));

    let ctx = context.clone();
    engine.on_print(move |text| ctx.script_output(text));
    let ctx = context.clone();
    engine.on_debug(move |text, source, pos| match source {
        Some(source) => ctx.script_output(&format!("{source} @ {pos:?} | {text}")),
        None => ctx.script_output(text),
    });

    let ctx = context.clone();
    engine.on_var(move |name, index, scope_ctx| {
        if index > 0 || scope_ctx.scope().contains(name) {
            return Ok(None);
        }
        Ok(ctx.lookup_global(name))
    });
}

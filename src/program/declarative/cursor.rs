use crate::foundation::color::Color;
use crate::foundation::core::Canvas;
use crate::foundation::error::{EyeCandyError, ProgramError};
use crate::program::declarative::expr::{Scope, resolve};
use crate::program::declarative::model::{IntegrityDef, NodeDef, ProgramDoc};
use crate::program::host::{ProgramMetadata, ProgramNext, ProgramSession};
use crate::program::random::DeterministicRandom;
use crate::stimulus::spec::StimulusSpec;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Lazy expansion of a [`ProgramDoc`].
///
/// State is one frame per open node, so memory is bounded by nesting depth. A `shuffle`
/// frame additionally holds the permutation of its own units.
pub struct DeclarativeSession {
    metadata: ProgramMetadata,
    body: Arc<[NodeDef]>,
    rng: DeterministicRandom,
    root: Scope,
    stack: Vec<Frame>,
    pending: VecDeque<StimulusSpec>,
    integrity: Option<IntegrityClock>,
    initialized: bool,
    yielded: u64,
}

struct Frame {
    body: Arc<[NodeDef]>,
    order: Order,
    units: u64,
    pos: u64,
    scope: Scope,
    binding: Option<(String, Arc<[Value]>)>,
    /// Loop value of the current `for` iteration, resolved once per iteration.
    bound: Option<(u64, Value)>,
    path: String,
}

enum Order {
    Linear,
    Shuffled(Vec<u64>),
}

/// Tracks program time since the last integrity flash.
struct IntegrityClock {
    every: f64,
    elapsed: f64,
}

impl Frame {
    fn new(body: Arc<[NodeDef]>, times: u64, scope: Scope, path: String) -> Self {
        let units = times.saturating_mul(body.len() as u64);
        Self {
            body,
            order: Order::Linear,
            units,
            pos: 0,
            scope,
            binding: None,
            bound: None,
            path,
        }
    }
}

impl DeclarativeSession {
    pub(crate) fn new(doc: ProgramDoc, seed: u32, canvas: Canvas) -> Self {
        let mut root = Scope::default();
        root.vars
            .insert("windowWidth".to_owned(), Value::from(canvas.width));
        root.vars
            .insert("windowHeight".to_owned(), Value::from(canvas.height));
        Self {
            metadata: doc.metadata,
            body: doc.body,
            rng: DeterministicRandom::new(seed),
            root,
            stack: Vec::new(),
            pending: VecDeque::new(),
            integrity: doc.integrity.map(|IntegrityDef { every_secs }| IntegrityClock {
                every: every_secs,
                elapsed: every_secs,
            }),
            initialized: false,
            yielded: 0,
        }
    }

    /// Walk the frame stack to the next stimulus template and build it.
    fn next_from_body(&mut self) -> Result<Option<StimulusSpec>, ProgramError> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            if frame.pos >= frame.units {
                self.stack.pop();
                continue;
            }
            let unit = frame.pos;
            frame.pos += 1;

            let slot = match &frame.order {
                Order::Linear => unit,
                Order::Shuffled(perm) => perm[unit as usize],
            };
            let len = frame.body.len() as u64;
            let idx = (slot % len) as usize;
            let body = Arc::clone(&frame.body);
            let here = format!("{}[{idx}]", frame.path);
            let mut scope = frame.scope.clone();
            if let Some((var, values)) = &frame.binding {
                let iteration = slot / len;
                let cached = frame
                    .bound
                    .as_ref()
                    .filter(|(k, _)| *k == iteration)
                    .map(|(_, v)| v.clone());
                let value = match cached {
                    Some(v) => v,
                    None => {
                        let raw = &values[iteration as usize];
                        let v = resolve(raw, &scope, &mut self.rng, &format!("{here}.{var}"))?;
                        frame.bound = Some((iteration, v.clone()));
                        v
                    }
                };
                scope.vars.insert(var.clone(), value);
            }

            match &body[idx] {
                NodeDef::Stimulus(template) => {
                    return self.build(template, &scope, &format!("{here}.stimulus")).map(Some);
                }
                NodeDef::Group(g) => {
                    let path = format!("{here}.group");
                    for (k, v) in &g.metadata {
                        let value = resolve(v, &scope, &mut self.rng, &format!("{path}.metadata.{k}"))?;
                        scope.metadata.insert(k.clone(), value);
                    }
                    self.push(Frame::new(Arc::clone(&g.body), 1, scope, format!("{path}.body")));
                }
                NodeDef::Repeat(r) => {
                    let path = format!("{here}.repeat.body");
                    self.push(Frame::new(Arc::clone(&r.body), r.times, scope, path));
                }
                NodeDef::For(f) => {
                    let path = format!("{here}.for.body");
                    let mut frame = Frame::new(
                        Arc::clone(&f.body),
                        f.values.len() as u64,
                        scope,
                        path,
                    );
                    frame.binding = Some((f.var.clone(), Arc::clone(&f.values)));
                    self.push(frame);
                }
                NodeDef::Shuffle(s) => {
                    let path = format!("{here}.shuffle.body");
                    let mut frame = Frame::new(Arc::clone(&s.body), s.times, scope, path);
                    let mut perm: Vec<u64> = (0..frame.units).collect();
                    self.rng.shuffle(&mut perm);
                    frame.order = Order::Shuffled(perm);
                    self.push(frame);
                }
            }
        }
    }

    fn push(&mut self, frame: Frame) {
        if frame.units > 0 {
            self.stack.push(frame);
        }
    }

    fn build(
        &mut self,
        template: &Value,
        scope: &Scope,
        path: &str,
    ) -> Result<StimulusSpec, ProgramError> {
        let mut value = resolve(template, scope, &mut self.rng, path)?;
        if !scope.metadata.is_empty()
            && let Value::Object(map) = &mut value
        {
            let entry = map
                .entry("metadata")
                .or_insert_with(|| Value::Object(Default::default()));
            let Value::Object(own) = entry else {
                return Err(ProgramError::new(
                    "TypeError",
                    "metadata must be an object",
                    format!("{path}.metadata"),
                ));
            };
            for (k, v) in &scope.metadata {
                own.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        serde_json::from_value(value)
            .map_err(|e| ProgramError::new("TypeError", e.to_string(), path))
    }

    fn integrity_flash(&mut self) -> Result<[StimulusSpec; 3], ProgramError> {
        let group = self.rng.uuid();
        let tag = |s: StimulusSpec| {
            s.with_metadata("group", group.clone())
                .with_metadata("label", "integrity")
        };
        let built = (|| -> Result<[StimulusSpec; 3], EyeCandyError> {
            Ok([
                tag(StimulusSpec::wait(1.0)?),
                tag(StimulusSpec::solid(0.5, Color::WHITE)?),
                tag(StimulusSpec::wait(2.0)?),
            ])
        })();
        built.map_err(|e| ProgramError::new("Error", e.to_string(), "integrity"))
    }
}

impl ProgramSession for DeclarativeSession {
    fn metadata(&self) -> &ProgramMetadata {
        &self.metadata
    }

    fn initialize(&mut self) -> Result<(), ProgramError> {
        if self.initialized {
            return Err(ProgramError::new(
                "TypeError",
                "program is already initialized",
                "initialize",
            ));
        }
        self.initialized = true;
        let root = Frame::new(Arc::clone(&self.body), 1, self.root.clone(), "body".to_owned());
        self.push(root);
        Ok(())
    }

    fn next(&mut self) -> Result<ProgramNext, ProgramError> {
        if !self.initialized {
            return Err(ProgramError::new(
                "TypeError",
                "initialize() must be called before next()",
                "next",
            ));
        }
        if self.pending.is_empty() {
            let Some(stimulus) = self.next_from_body()? else {
                return Ok(ProgramNext::done(self.yielded));
            };
            let flash_due = self.integrity.as_ref().is_some_and(|clock| {
                clock.elapsed >= clock.every && !stimulus.metadata().contains_key("block")
            });
            if flash_due {
                let flash = self.integrity_flash()?;
                self.pending.extend(flash);
            }
            if let Some(clock) = &mut self.integrity {
                if flash_due {
                    clock.elapsed = 0.0;
                }
                clock.elapsed += stimulus.lifespan();
            }
            self.pending.push_back(stimulus);
        }

        match self.pending.pop_front() {
            Some(stimulus) => {
                let out = ProgramNext::yielded(self.yielded, stimulus);
                self.yielded += 1;
                Ok(out)
            }
            None => Ok(ProgramNext::done(self.yielded)),
        }
    }
}

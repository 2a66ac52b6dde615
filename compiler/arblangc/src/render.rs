//! Plain-text rendering of `--emit=ir` and `--emit=preprint` summaries.
//!
//! There is no C++ text emitter in this workspace (§1's scope line stops at
//! the `PrintableMechanism` description, §4.12); what a user actually gets
//! back from `arblangc` is a readable dump of whichever stage they asked
//! for, the same role `oric parse`/`oric lex` play for the teacher — a
//! way to look at what a pass produced without attaching a debugger.

use arblang_ir::{ExprKind, Mechanism, RExpr};
use arblang_preprint::{KernelMaps, PrintableMechanism};

pub fn render_ir(mechanism: &Mechanism) -> String {
    let mut out = String::new();
    out.push_str(&format!("mechanism {} ({:?})\n", mechanism.name, mechanism.kind));
    out.push_str(&format!("  states:      {}\n", mechanism.states.len()));
    out.push_str(&format!("  parameters:  {}\n", mechanism.parameters.len()));
    out.push_str(&format!("  bindings:    {}\n", mechanism.bindings.len()));
    out.push_str(&format!("  initials:    {}\n", mechanism.initializations.len()));
    out.push_str(&format!("  evolutions:  {}\n", mechanism.evolutions.len()));
    out.push_str(&format!("  effects:     {}\n", mechanism.effects.len()));
    out.push_str(&format!("  on_events:   {}\n", mechanism.on_events.len()));
    for evolve in &mechanism.evolutions {
        out.push_str(&format!("  evolve {} = {}\n", render_expr(&evolve.identifier), render_expr(&evolve.value)));
    }
    for effect in &mechanism.effects {
        out.push_str(&format!("  effect {:?} = {}\n", effect.effect, render_expr(&effect.value)));
    }
    out
}

pub fn render_preprint(printable: &PrintableMechanism) -> String {
    let mut out = String::new();
    out.push_str(&format!("mechanism {} ({:?})\n", printable.name, printable.kind));

    out.push_str("  ion fields:\n");
    for ion in &printable.ion_fields {
        out.push_str(&format!(
            "    {}: read_valence={} write_internal={} write_external={}\n",
            ion.ion, ion.read_valence, ion.write_internal_concentration, ion.write_external_concentration
        ));
    }

    render_kernel(&mut out, "init", &printable.init);
    render_kernel(&mut out, "evolve", &printable.evolve);
    render_kernel(&mut out, "effect", &printable.effect);
    render_kernel(&mut out, "event", &printable.event);

    out
}

fn render_kernel(out: &mut String, name: &str, kernel: &KernelMaps) {
    out.push_str(&format!("  kernel {name}:\n"));
    out.push_str("    reads:\n");
    for (pointer, source) in &kernel.reads.parameters {
        out.push_str(&format!("      parameter {source} <- {pointer}\n"));
    }
    for (pointer, source) in &kernel.reads.bindings {
        out.push_str(&format!("      binding {source} <- {pointer}\n"));
    }
    for (pointer, source) in &kernel.reads.states {
        out.push_str(&format!("      state {source} <- {pointer}\n"));
    }
    out.push_str("    writes:\n");
    for (target, value) in &kernel.writes {
        out.push_str(&format!("      {target} = {}\n", render_expr(value)));
    }
}

fn render_expr(expr: &RExpr) -> String {
    match &expr.kind {
        ExprKind::IntLit(v) => v.to_string(),
        ExprKind::FloatLit(v) => v.to_string(),
        ExprKind::Argument(name) | ExprKind::Variable(name, _) => name.to_string(),
        ExprKind::Object(fields) => {
            let rendered: Vec<_> = fields.iter().map(render_expr).collect();
            format!("{{{}}}", rendered.join(", "))
        }
        ExprKind::FieldAccess(object, field) => format!("{}.{field}", render_expr(object)),
        ExprKind::Let(identifier, body) => format!("let {} in {}", render_expr(identifier), render_expr(body)),
        ExprKind::Conditional(cond, if_true, if_false) => {
            format!("if {} then {} else {}", render_expr(cond), render_expr(if_true), render_expr(if_false))
        }
        ExprKind::Unary(op, arg) => format!("{op:?}({})", render_expr(arg)),
        ExprKind::Binary(op, lhs, rhs) => format!("({} {op:?} {})", render_expr(lhs), render_expr(rhs)),
        ExprKind::Call(name, args) => {
            let rendered: Vec<_> = args.iter().map(render_expr).collect();
            format!("{name}({})", rendered.join(", "))
        }
    }
}

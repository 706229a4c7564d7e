// Epsilon-Closure-Simulator fuer Grammar-Tests.
//
// Wird per `include!` eingebunden. Benötigte Imports:
//   use exigram::grammar::{Event, Grammar, NonTermId};

/// Alle Rules, die von `start` ueber ε-Productions erreichbar sind (inkl. `start`).
fn epsilon_closure(grammar: &Grammar, start: &[u32]) -> Vec<u32> {
    let mut seen = vec![false; grammar.rule_count()];
    let mut stack: Vec<u32> = start.to_vec();
    let mut out = Vec::new();
    while let Some(r) = stack.pop() {
        if std::mem::replace(&mut seen[r as usize], true) {
            continue;
        }
        out.push(r);
        for p in grammar.rule(r).expect("rule in range").productions() {
            if let (Event::Void, NonTermId::Rule(t)) = (p.event, p.target) {
                stack.push(t);
            }
        }
    }
    out.sort_unstable();
    out
}

/// Events, die in Rule `rule` (durch ε gelesen) angeboten werden, ohne ε selbst.
fn offered(grammar: &Grammar, rule: u32) -> Vec<Event> {
    let mut events = Vec::new();
    for r in epsilon_closure(grammar, &[rule]) {
        for p in grammar.rule(r).expect("rule in range").productions() {
            if p.event != Event::Void && !events.contains(&p.event) {
                events.push(p.event);
            }
        }
    }
    events
}

/// Ziel-Rules von `event` aus Rule `rule` (durch ε gelesen).
fn step(grammar: &Grammar, rule: u32, event: Event) -> Vec<u32> {
    let mut next = Vec::new();
    for r in epsilon_closure(grammar, &[rule]) {
        for p in grammar.rule(r).expect("rule in range").productions() {
            if p.event == event
                && let NonTermId::Rule(t) = p.target
            {
                next.push(t);
            }
        }
    }
    next
}

/// Ob die Grammar die Event-Folge akzeptiert; das abschliessende EE ist implizit.
fn accepts(grammar: &Grammar, events: &[Event]) -> bool {
    let mut states = epsilon_closure(grammar, &[0]);
    for &event in events {
        let mut next = Vec::new();
        for &r in &states {
            next.extend(step(grammar, r, event));
        }
        if next.is_empty() {
            return false;
        }
        states = epsilon_closure(grammar, &next);
    }
    states
        .iter()
        .any(|&r| grammar.rule(r).expect("rule in range").has_end_element())
}

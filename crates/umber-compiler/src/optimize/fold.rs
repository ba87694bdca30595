//! Bottom-up tree rewriting: arithmetic folding and assignment
//! classification.

use umber_core::{Node, Num};

/// Rewrite a tree into a semantically identical, folded form.
pub fn optimize(root: &Node) -> Node {
    Folder { line: 0 }.rewrite(root)
}

/// Rewriter state. `line` tracks the nearest source line seen so far, for
/// stamping synthesized literal nodes.
struct Folder {
    line: u32,
}

impl Folder {
    fn rewrite(&mut self, nd: &Node) -> Node {
        if let Some(l) = nd.get("line").and_then(|s| s.parse().ok()) {
            self.line = l;
        }
        match nd.tag.as_str() {
            "minus" => self.fold_minus(nd),
            "add" => self.fold_add(nd),
            "sub" => self.fold_sub(nd),
            "mul" => self.fold_mul(nd),
            "div" => self.fold_div(nd),
            "land" | "lor" | "band" | "bor" | "bxor" => self.flatten(nd),
            "assign" => self.classify_assign(nd),
            "anon" | "func" => self.fold_fn(nd),
            _ => self.rewrite_children(nd),
        }
    }

    /// Default rule: copy tag and attributes, rewrite each child.
    fn rewrite_children(&mut self, nd: &Node) -> Node {
        let mut out = nd.shell();
        out.children = nd.children.iter().map(|c| self.rewrite(c)).collect();
        out
    }

    /// Rewrite children, splicing any child of the same tag in place.
    fn flatten(&mut self, nd: &Node) -> Node {
        let mut out = nd.shell();
        for c in &nd.children {
            let c = self.rewrite(c);
            if c.tag == nd.tag {
                out.children.extend(c.children);
            } else {
                out.children.push(c);
            }
        }
        out
    }

    fn fold_minus(&mut self, nd: &Node) -> Node {
        let ch = self.rewrite(&nd.children[0]);
        if let Some(n) = ch.num() {
            return Node::from_num(n.neg(), self.line);
        }
        if ch.tag == "minus" {
            return ch.children.into_iter().next().expect("minus without operand");
        }
        let mut out = nd.shell();
        out.children.push(ch);
        out
    }

    fn fold_add(&mut self, nd: &Node) -> Node {
        let flat = self.flatten(nd);
        let mut agg: Option<Num> = None;
        let mut rest = Vec::with_capacity(flat.children.len());
        for c in flat.children {
            match c.num() {
                Some(n) => agg = Some(agg.map_or(n, |a| a.add(n))),
                None => rest.push(c),
            }
        }
        let mut num = agg.filter(|n| !n.is_zero()).unwrap_or(Num::Int(0));

        // Fold a trailing literal out of each sub operand into the aggregate.
        let mut out = Vec::with_capacity(rest.len());
        for mut c in rest {
            if c.tag != "sub" {
                out.push(c);
                continue;
            }
            let Some(last) = c.children.last().and_then(Node::num) else {
                out.push(c);
                continue;
            };
            num = num.sub(last);
            c.children.pop();
            if c.children.len() == 1 {
                out.push(c.children.pop().expect("sub operand"));
            } else {
                out.push(c);
            }
        }

        if !num.is_zero() {
            if out.is_empty() {
                return Node::from_num(num, self.line);
            }
            out.push(Node::from_num(num, self.line));
        }
        if out.is_empty() {
            // Everything cancelled: the sum is the (zero) aggregate.
            return Node::from_num(num, self.line);
        }
        if out.len() == 1 {
            return out.pop().expect("single operand");
        }
        let mut result = nd.shell();
        result.children = out;
        result
    }

    fn fold_sub(&mut self, nd: &Node) -> Node {
        let a = self.rewrite(&nd.children[0]);
        let b = self.rewrite(&nd.children[1]);
        if let (Some(na), Some(nb)) = (a.num(), b.num()) {
            return Node::from_num(na.sub(nb), self.line);
        }
        if b.num().is_some_and(Num::is_zero) {
            return a;
        }
        if a.num().is_some_and(Num::is_zero) {
            return Node::new("minus")
                .attr("line", self.line.to_string())
                .child(b);
        }
        let mut out = nd.shell();
        out.children = vec![a, b];
        out
    }

    fn fold_mul(&mut self, nd: &Node) -> Node {
        let flat = self.flatten(nd);
        let mut agg: Option<Num> = None;
        let mut out = Vec::with_capacity(flat.children.len());
        for c in flat.children {
            match c.num() {
                Some(n) => agg = Some(agg.map_or(n, |a| a.mul(n))),
                None => out.push(c),
            }
        }
        if let Some(n) = agg {
            if n.is_zero() {
                return Node::from_num(n, self.line);
            }
            if !n.is_one() {
                out.push(Node::from_num(n, self.line));
            }
        }
        if out.len() == 1 {
            return out.pop().expect("single operand");
        }
        if out.is_empty() {
            return Node::from_num(agg.unwrap_or(Num::Int(1)), self.line);
        }
        let mut result = nd.shell();
        result.children = out;
        result
    }

    fn fold_div(&mut self, nd: &Node) -> Node {
        let a = self.rewrite(&nd.children[0]);
        let b = self.rewrite(&nd.children[1]);
        // 0 / literal-nonzero folds; a variable divisor keeps its runtime
        // division-by-zero behavior.
        if a.num().is_some_and(Num::is_zero) && b.num().is_some_and(|n| !n.is_zero()) {
            return a;
        }
        let mut out = nd.shell();
        out.children = vec![a, b];
        out
    }

    fn classify_assign(&mut self, nd: &Node) -> Node {
        if nd.children[0].tag != "obj1" {
            return self.rewrite_children(nd);
        }
        let lhs = nd.children[0].clone();
        let rhs = self.rewrite(&nd.children[1]);
        let tag = match rhs.tag.as_str() {
            "nil" | "bool" | "int" | "float" | "str" => "assign1c",
            "obj1" => "assign11",
            _ => "assign1",
        };
        let mut out = Node::new(tag);
        out.attrs = nd.attrs.clone();
        out.children = vec![lhs, rhs];
        out
    }

    /// Function literals keep their parameter list untouched; only the body
    /// is rewritten.
    fn fold_fn(&mut self, nd: &Node) -> Node {
        let mut out = nd.shell();
        out.children.push(nd.children[0].clone());
        out.children.push(self.rewrite(&nd.children[1]));
        out
    }
}

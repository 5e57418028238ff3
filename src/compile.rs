use smol_str::format_smolstr;

use crate::{
    dialect::Dialect,
    error::{Error, Result},
    expr::Expr,
    member::Member,
    operator::{BinaryOp, Method},
    value::Value,
    writer::{FormatContext, FormatWriter},
};

/// A compiled predicate: sql with `{N}` placeholders and the literal for
/// each of them, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub template: String,
    pub arguments: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct Compiler {
    dialect: Dialect,
}

enum Task<'e> {
    Visit(&'e Expr),
    Binary(BinaryOp),
    Call(Method),
    Array(usize),
    Spread(Method, &'e [Value]),
}

#[derive(Debug)]
enum Part {
    /// A `Constant(Null)`, resolved by the parent node.
    Null,
    Sql { text: String, arithmetic: bool },
}

impl Part {
    fn sql(text: String) -> Self {
        Part::Sql {
            text,
            arithmetic: false,
        }
    }
}

impl Compiler {
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Folds `expr` and compiles what remains to a parameterized template.
    pub fn compile(&self, expr: &Expr) -> Result<Compiled> {
        let folded = expr.partial_eval()?;
        match folded {
            Expr::Constant(Value::Bool(true)) => return Err(Error::EmptyPredicate),
            Expr::Constant(Value::Bool(false)) => return Err(Error::ContradictoryPredicate),
            _ => {}
        }
        let compiled = self.emit(&folded)?;
        tracing::trace!(
            template = %compiled.template,
            arguments = compiled.arguments.len(),
            "compiled predicate"
        );
        Ok(compiled)
    }

    /// Compiles a projection such as `a.Age.Value`, which must not need any
    /// bound argument.
    pub fn compile_selector(&self, expr: &Expr) -> Result<String> {
        let compiled = self.compile(expr)?;
        if !compiled.arguments.is_empty() {
            return Err(Error::unsupported(format_smolstr!(
                "selector `{}` needs {} bound argument(s)",
                compiled.template,
                compiled.arguments.len()
            )));
        }
        Ok(compiled.template)
    }

    fn emit(&self, root: &Expr) -> Result<Compiled> {
        let mut tasks = vec![Task::Visit(root)];
        let mut parts: Vec<Part> = Vec::new();
        let mut arguments = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(expr) => match expr {
                    Expr::Constant(value) => parts.push(constant(value.clone(), &mut arguments)),
                    Expr::Captured(captured) => parts.push(constant(captured.read(), &mut arguments)),
                    Expr::Member(member) => parts.push(Part::sql(self.member(member)?)),
                    Expr::Unary(operand) => tasks.push(Task::Visit(operand)),
                    Expr::NewArray(elements) => {
                        tasks.push(Task::Array(elements.len()));
                        tasks.extend(elements.iter().rev().map(Task::Visit));
                    }
                    Expr::Binary(binary) => {
                        tasks.push(Task::Binary(binary.op));
                        tasks.push(Task::Visit(&binary.rhs));
                        tasks.push(Task::Visit(&binary.lhs));
                    }
                    Expr::MethodCall(call) => {
                        let method = call.method().ok_or_else(|| {
                            Error::unsupported(format_smolstr!("method `{}`", call.name()))
                        })?;
                        let Some((receiver, [argument])) = call.split() else {
                            return Err(Error::unsupported(format_smolstr!(
                                "`{}` takes exactly one argument",
                                method.name()
                            )));
                        };
                        // a folded list receiver is a membership test
                        if let (Method::Contains, Expr::Constant(Value::List(items))) = (method, receiver) {
                            tasks.push(Task::Call(Method::In));
                            tasks.push(Task::Spread(Method::Contains, items));
                            tasks.push(Task::Visit(argument));
                            continue;
                        }
                        tasks.push(Task::Call(method));
                        match argument {
                            Expr::Constant(Value::List(items))
                                if matches!(method, Method::In | Method::NotIn) =>
                            {
                                tasks.push(Task::Spread(method, items))
                            }
                            argument => tasks.push(Task::Visit(argument)),
                        }
                        tasks.push(Task::Visit(receiver));
                    }
                },
                Task::Binary(op) => {
                    let rhs = pop(&mut parts)?;
                    let lhs = pop(&mut parts)?;
                    parts.push(binary(op, lhs, rhs)?);
                }
                Task::Call(method) => {
                    let argument = pop(&mut parts)?;
                    let receiver = pop(&mut parts)?;
                    parts.push(Part::sql(self.call(method, receiver, argument)?));
                }
                Task::Array(len) => {
                    let start = parts
                        .len()
                        .checked_sub(len)
                        .ok_or_else(|| Error::contract("array operands missing from the stack"))?;
                    let elements: Vec<String> = parts.drain(start..).map(into_text).collect();
                    parts.push(Part::sql(elements.join(",")));
                }
                Task::Spread(method, items) => {
                    if items.is_empty() {
                        return Err(Error::EmptyCollection(format_smolstr!("{}", method.name())));
                    }
                    let elements: Vec<String> = items
                        .iter()
                        .map(|item| into_text(constant(item.clone(), &mut arguments)))
                        .collect();
                    parts.push(Part::sql(elements.join(",")));
                }
            }
        }

        let root = pop(&mut parts)?;
        if !parts.is_empty() {
            return Err(Error::contract(format_smolstr!(
                "{} unconsumed operand(s) after compiling",
                parts.len()
            )));
        }
        match root {
            Part::Null => Err(Error::EmptyPredicate),
            Part::Sql { text, .. } => Ok(Compiled {
                template: text,
                arguments,
            }),
        }
    }

    fn member(&self, member: &Member) -> Result<String> {
        if !member.is_model() {
            return Err(Error::unsupported(format_smolstr!(
                "`{}` reads a value that is not a model field",
                member.path()
            )));
        }
        let mut text = String::new();
        member
            .format_writer(&mut FormatContext::new(&mut text, self.dialect))
            .map_err(|_| Error::contract(format_smolstr!("cannot render `{}`", member.path())))?;
        Ok(text)
    }

    fn call(&self, method: Method, receiver: Part, argument: Part) -> Result<String> {
        let Part::Sql { text: field, .. } = receiver else {
            return Err(Error::unsupported(format_smolstr!("`{}` on NULL", method.name())));
        };
        let argument = match argument {
            Part::Sql { text, .. } => text,
            Part::Null if method == Method::Equals => return Ok(format!("({field} IS NULL)")),
            Part::Null => {
                return Err(Error::unsupported(format_smolstr!(
                    "`{}` with a NULL argument",
                    method.name()
                )));
            }
        };

        let sql = match method {
            Method::StartsWith | Method::EndsWith | Method::Contains => {
                let (prefix, suffix) = method.wildcards().unwrap_or_default();
                let concat = self.dialect.like_concat();
                format!("({field} LIKE {prefix}{concat}{argument}{concat}{suffix})")
            }
            Method::Like => format!("({field} LIKE {argument})"),
            Method::NotLike => format!("({field} NOT LIKE {argument})"),
            Method::In => format!("({field} IN ({argument}))"),
            Method::NotIn => format!("({field} NOT IN ({argument}))"),
            Method::Equals => format!("({field} = {argument})"),
        };
        Ok(sql)
    }
}

fn pop(parts: &mut Vec<Part>) -> Result<Part> {
    parts
        .pop()
        .ok_or_else(|| Error::contract("operand stack is empty"))
}

fn constant(value: Value, arguments: &mut Vec<Value>) -> Part {
    if value.is_null() {
        return Part::Null;
    }
    let text = format!("{{{}}}", arguments.len());
    arguments.push(value);
    Part::sql(text)
}

fn into_text(part: Part) -> String {
    match part {
        Part::Null => "NULL".to_owned(),
        Part::Sql { text, .. } => text,
    }
}

fn binary(op: BinaryOp, lhs: Part, rhs: Part) -> Result<Part> {
    let (lhs, rhs) = match (lhs, rhs) {
        (Part::Null, Part::Null) => {
            return Err(Error::unsupported(format_smolstr!("NULL {} NULL", op.symbol())));
        }
        (Part::Null, Part::Sql { text, .. }) | (Part::Sql { text, .. }, Part::Null) => {
            let keyword = op.null_symbol()?;
            return Ok(Part::sql(format!("{text} {keyword}")));
        }
        (Part::Sql { text: lhs, arithmetic: l }, Part::Sql { text: rhs, arithmetic: r }) => {
            let wrap = |text: String, arithmetic: bool| {
                if arithmetic && op.is_arithmetic() {
                    format!("({text})")
                } else {
                    text
                }
            };
            (wrap(lhs, l), wrap(rhs, r))
        }
    };

    let symbol = op.symbol();
    let text = if op.is_grouping() {
        format!("({lhs} {symbol} {rhs})")
    } else {
        format!("{lhs} {symbol} {rhs}")
    };
    Ok(Part::Sql {
        text,
        arithmetic: op.is_arithmetic(),
    })
}

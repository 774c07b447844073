/*!

`tensor-factor` finds intermediates in tensor-contraction equations.

Many-body methods such as coupled cluster are written as sums of
products of tensors: integrals, amplitudes and, for excited states, sigma
(trial) vectors. Evaluated term by term these equations repeat the same
sub-products over and over, and each product is evaluated in whatever
order it happened to be written. This crate rewrites a set of
[`Equation`]s so that

- every product is contracted in its cheapest order, and
- common sub-products are declared once as temporaries and referenced
  everywhere they occur,

without ever making the combined cost of the equations worse.

Costs are abstract: every contraction is assigned the [`Shape`] of the
index lines it loops over (`o2v4` for two occupied and four virtual
lines), and the cost of an equation is the [`ScalingMap`] counting its
contractions per shape. Profiles are compared from the most expensive
shape down.

Expressions are trees of [`Vertex`]es. Leaves are [`Tensor`]s and
constants; inner nodes are [`Linkage`]s, binary contractions or
additions that cache their derived data. Vertices can be written and
printed as s-expressions:

```
use tensor_factor::Vertex;

let product: Vertex = "(* (t2 a b i j) (V i j k l))".parse().unwrap();
assert_eq!(product.lines().len(), 4);
assert_eq!(product.to_string(), "(* (t2 a b i j) (V i j k l))");
```

The search itself is run by a [`Factorizer`].

## Logging

Many parts of `tensor-factor` dump useful logging info using the [`log`](https://docs.rs/log/) crate.
The easiest way to see this info is to use the [`env_logger`](https://docs.rs/env_logger/)
crate in your binary or test.
The simplest way to enable `env_logger` is to put the following line near the top of your `main`:
`env_logger::init();`.
Then, set the environment variable `RUST_LOG=tensor_factor=info`, or use `warn` or `debug` instead of info
for less or more logging.

*/

mod config;
mod consolidate;
mod equation;
mod error;
mod factorize;
mod line;
mod linkage;
mod linkage_set;
mod scaling;
mod temp;
mod term;
mod util;
mod vertex;

pub use {
    config::{Config, Limit, SubstituteTarget},
    equation::{sort_tmp_type, Equation, ZERO_TOLERANCE},
    error::{Error, Result},
    factorize::{Factorizer, Iteration, SearchState, StopReason},
    line::{Line, Lines, Shape, Space},
    linkage::{low_memory, set_low_memory, LinkOp, Linkage},
    linkage_set::LinkageSet,
    scaling::{Comparison, ScalingMap},
    temp::{PerKind, TempId, TempKind},
    term::{Permutation, Term},
    util::*,
    vertex::{link, Constant, Tensor, Vertex},
};

#[cfg(test)]
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

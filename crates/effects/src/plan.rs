/// Texture a compositor pass samples as its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassInput {
    /// The primary scene texture (scene slot 0).
    Primary,
    /// One of the two intermediate ping-pong buffers.
    PingPong(usize),
}

/// Texture a compositor pass renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutput {
    PingPong(usize),
    /// The presentation target (surface or export texture).
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub input: PassInput,
    pub output: PassOutput,
}

/// Lays out read/write targets for a chain of `effect_count` effects.
///
/// An empty chain is planned as a single pass-through pass. The primary
/// texture is only ever read, so scenes can keep rendering into it.
pub fn plan_passes(effect_count: usize) -> Vec<PassPlan> {
    let passes = effect_count.max(1);
    (0..passes)
        .map(|index| PassPlan {
            input: if index == 0 {
                PassInput::Primary
            } else {
                PassInput::PingPong((index - 1) % 2)
            },
            output: if index + 1 == passes {
                PassOutput::Final
            } else {
                PassOutput::PingPong(index % 2)
            },
        })
        .collect()
}

/// Number of intermediate buffers a chain of `effect_count` effects needs.
pub fn ping_pong_buffers(effect_count: usize) -> usize {
    effect_count.saturating_sub(1).min(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pass_goes_straight_to_output() {
        assert_eq!(
            plan_passes(0),
            vec![PassPlan {
                input: PassInput::Primary,
                output: PassOutput::Final
            }]
        );
        assert_eq!(plan_passes(1), plan_passes(0));
        assert_eq!(ping_pong_buffers(0), 0);
        assert_eq!(ping_pong_buffers(1), 0);
    }

    #[test]
    fn long_chains_alternate_buffers() {
        let plan = plan_passes(4);
        let expected = [
            (PassInput::Primary, PassOutput::PingPong(0)),
            (PassInput::PingPong(0), PassOutput::PingPong(1)),
            (PassInput::PingPong(1), PassOutput::PingPong(0)),
            (PassInput::PingPong(0), PassOutput::Final),
        ];
        assert_eq!(plan.len(), expected.len());
        for (pass, (input, output)) in plan.iter().zip(expected) {
            assert_eq!(pass.input, input);
            assert_eq!(pass.output, output);
        }
        assert_eq!(ping_pong_buffers(4), 2);
    }

    #[test]
    fn no_pass_reads_what_it_writes() {
        for count in 0..8 {
            for pass in plan_passes(count) {
                if let (PassInput::PingPong(read), PassOutput::PingPong(write)) =
                    (pass.input, pass.output)
                {
                    assert_ne!(read, write);
                }
                assert!(matches!(pass.input, PassInput::Primary | PassInput::PingPong(0 | 1)));
            }
        }
    }

    #[test]
    fn two_effects_need_one_buffer() {
        let plan = plan_passes(2);
        assert_eq!(plan[0].output, PassOutput::PingPong(0));
        assert_eq!(plan[1].input, PassInput::PingPong(0));
        assert_eq!(ping_pong_buffers(2), 1);
    }
}

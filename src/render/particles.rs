use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::color::Rgb;

#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining life in frames.
    pub life: u32,
    pub max_life: u32,
    pub size: f32,
    pub color: Rgb,
}

impl Particle {
    /// 1.0 when freshly spawned, approaching 0.0 as the particle expires.
    pub fn vitality(&self) -> f32 {
        if self.max_life == 0 {
            return 0.0;
        }
        self.life as f32 / self.max_life as f32
    }
}

/// Fixed-capacity particle arena.
///
/// Dead slots go on a free list and are reused by the next spawn, so memory
/// stays constant no matter how long the run is. When every slot is live,
/// new spawns are dropped.
pub struct ParticlePool {
    slots: Vec<Option<Particle>>,
    free: Vec<usize>,
    rng: StdRng,
}

impl ParticlePool {
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            slots: vec![None; capacity],
            free: (0..capacity).rev().collect(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns false when the pool is full.
    pub fn spawn(&mut self, particle: Particle) -> bool {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(particle);
                true
            }
            None => false,
        }
    }

    /// Emit `count` particles from `origin` in random directions.
    pub fn burst(&mut self, origin: (f32, f32), count: usize, speed: f32, life: u32, size: f32, color: Rgb) {
        for _ in 0..count {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let velocity = speed * self.rng.gen_range(0.4..1.0f32);
            let particle = Particle {
                x: origin.0,
                y: origin.1,
                vx: angle.cos() * velocity,
                vy: angle.sin() * velocity,
                life,
                max_life: life,
                size,
                color,
            };
            if !self.spawn(particle) {
                break;
            }
        }
    }

    /// Advance one frame: move, apply drag and gravity, retire expired particles.
    pub fn step(&mut self, drag: f32, gravity: f32) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(p) = slot else {
                continue;
            };
            p.x += p.vx;
            p.y += p.vy;
            p.vx *= drag;
            p.vy = p.vy * drag + gravity;
            p.life = p.life.saturating_sub(1);
            if p.life == 0 {
                *slot = None;
                self.free.push(index);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(life: u32) -> Particle {
        Particle {
            x: 0.0,
            y: 0.0,
            vx: 1.0,
            vy: 0.0,
            life,
            max_life: life,
            size: 1.0,
            color: Rgb::WHITE,
        }
    }

    #[test]
    fn spawn_stops_at_capacity() {
        let mut pool = ParticlePool::new(3, 1);
        assert!(pool.spawn(particle(5)));
        assert!(pool.spawn(particle(5)));
        assert!(pool.spawn(particle(5)));
        assert!(!pool.spawn(particle(5)));
        assert_eq!(pool.live(), 3);
    }

    #[test]
    fn expired_slots_are_recycled() {
        let mut pool = ParticlePool::new(2, 1);
        pool.spawn(particle(1));
        pool.spawn(particle(3));
        pool.step(1.0, 0.0);
        assert_eq!(pool.live(), 1);
        assert!(pool.spawn(particle(3)));
        assert_eq!(pool.live(), 2);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn long_runs_stay_bounded() {
        let mut pool = ParticlePool::new(64, 7);
        for _ in 0..10_000 {
            pool.burst((0.0, 0.0), 16, 3.0, 20, 2.0, Rgb::WHITE);
            pool.step(0.95, 0.1);
            assert!(pool.live() <= 64);
        }
        assert_eq!(pool.iter().count(), pool.live());
    }

    #[test]
    fn same_seed_same_motion() {
        let mut a = ParticlePool::new(8, 42);
        let mut b = ParticlePool::new(8, 42);
        a.burst((5.0, 5.0), 8, 2.0, 10, 1.0, Rgb::WHITE);
        b.burst((5.0, 5.0), 8, 2.0, 10, 1.0, Rgb::WHITE);
        let pa: Vec<(f32, f32)> = a.iter().map(|p| (p.vx, p.vy)).collect();
        let pb: Vec<(f32, f32)> = b.iter().map(|p| (p.vx, p.vy)).collect();
        assert_eq!(pa, pb);
    }
}
